//! Interface declaration macro.

/// Declare a remote interface.
///
/// Generates the trait itself, its [`RemoteInterface`](crate::RemoteInterface)
/// impl with a dispatch table, a forwarding impl for
/// [`Stub<dyn Trait>`](crate::Stub), and `<dyn Trait>::binding(service)` for
/// registering an implementation.
///
/// Every method takes `&self`, declares its return type, and returns
/// `conduit_core::Result<T>` in the generated trait. Parameter and return
/// types must implement [`WireType`](crate::WireType).
///
/// ```rust,ignore
/// conduit_core::remote_interface! {
///     /// Greets people.
///     pub trait Hello as "example.Hello" {
///         fn hi(&self, name: String) -> String;
///         fn hi_maybe(&self, name: Option<String>) -> Option<String>;
///     }
/// }
///
/// let engine = InvocationEngine::builder()
///     .interface::<dyn Hello>()
///     .resolver(move |_: &str| -> conduit_core::Result<ServiceBinding> {
///         Ok(<dyn Hello>::binding(service.clone()))
///     })
///     .build()?;
/// ```
#[macro_export]
macro_rules! remote_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $trait_name:ident as $wire_name:literal {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) -> $ret:ty;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $trait_name: ::std::marker::Send + ::std::marker::Sync + 'static {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $arg_ty)*) -> $crate::Result<$ret>;
            )*
        }

        impl $crate::RemoteInterface for dyn $trait_name {
            const NAME: &'static str = $wire_name;

            #[allow(unused_mut, unused_variables)]
            fn dispatch_table() -> $crate::DispatchTable<Self> {
                let mut table = $crate::DispatchTable::new();
                $(
                    table.insert(
                        $crate::MethodDescriptor::new(
                            ::std::stringify!($method),
                            ::std::vec![$(<$arg_ty as $crate::WireType>::declared()),*],
                            <$ret as $crate::WireType>::declared(),
                        ),
                        |service: &Self, args: ::std::vec::Vec<$crate::CallValue>| {
                            let mut args = args.into_iter();
                            $(
                                let $arg = <$arg_ty as $crate::WireType>::from_call_value(
                                    args.next().ok_or_else(|| {
                                        $crate::ConduitError::protocol(::std::concat!(
                                            "missing argument ",
                                            ::std::stringify!($arg)
                                        ))
                                    })?,
                                )?;
                            )*
                            let result = service.$method($($arg),*)?;
                            $crate::WireType::into_call_value(result)
                        },
                    );
                )*
                table
            }
        }

        impl $trait_name for $crate::Stub<dyn $trait_name> {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) -> $crate::Result<$ret> {
                    let descriptor = $crate::MethodDescriptor::new(
                        ::std::stringify!($method),
                        ::std::vec![$(<$arg_ty as $crate::WireType>::declared()),*],
                        <$ret as $crate::WireType>::declared(),
                    );
                    let args = ::std::vec![$($crate::WireType::into_call_value($arg)?),*];
                    let result = self.call(&descriptor, args)?;
                    <$ret as $crate::WireType>::from_call_value(result)
                }
            )*
        }

        impl dyn $trait_name {
            /// Bind `service` for remote invocation through this interface.
            pub fn binding<S: $trait_name>(
                service: ::std::sync::Arc<S>,
            ) -> $crate::ServiceBinding {
                let instance: ::std::sync::Arc<dyn $trait_name> = service.clone();
                $crate::ServiceBinding::new::<dyn $trait_name, S>(service, instance)
            }
        }
    };
}
