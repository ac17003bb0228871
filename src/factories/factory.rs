use crate::{
    downcast_svc, DynSvc, InjectError, InjectResult, Service, ServiceInfo, Svc,
};

/// A factory for creating instances of a service. All functions of arity 6
/// or less are automatically factories if each parameter is a service
/// pointer ([`Svc<T>`]) and the return value is a valid service type.
///
/// The declared parameter types, in order, become the argument shapes of the
/// definition's key. When resolving, each parameter is either bound to a
/// runtime argument of the same type or resolved from the container.
///
/// ```
/// use graph_injector::{Factory, ServiceInfo, Svc};
///
/// struct Engine;
/// struct Car(Svc<Engine>);
///
/// fn assert_factory<D, R, F: Factory<D, R>>(_: &F) -> Vec<ServiceInfo> {
///     F::arguments()
/// }
///
/// assert_eq!(vec![ServiceInfo::of::<Engine>()], assert_factory(&Car));
/// ```
///
/// # Type parameters
/// * `D` - Argument types of this factory as a tuple.
/// * `R` - Resulting service from invoking this factory.
pub trait Factory<D, R>: Service {
    /// The argument shapes of this factory, in order.
    fn arguments() -> Vec<ServiceInfo>
    where
        Self: Sized;

    /// Invokes this factory with already-resolved, type-erased arguments.
    fn invoke(&self, args: Vec<DynSvc>) -> InjectResult<R>;
}

fn next_argument<T: Service>(
    args: &mut std::vec::IntoIter<DynSvc>,
) -> InjectResult<Svc<T>> {
    let arg = args.next().ok_or_else(|| {
        InjectError::InternalError(format!(
            "missing argument of type {}",
            ServiceInfo::of::<T>().name()
        ))
    })?;
    downcast_svc(arg)
}

macro_rules! impl_factory {
    () => {
        impl_factory!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_factory!(@impl ($first $(, $rest)*));
        impl_factory!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl <F, R $(, $type_name)*> Factory<($($type_name,)*), R> for F
        where
            F: Service + Fn($(Svc<$type_name>),*) -> R,
            R: Service,
            $($type_name: Service,)*
        {
            fn arguments() -> Vec<ServiceInfo> {
                vec![$(ServiceInfo::of::<$type_name>()),*]
            }

            #[allow(unused_variables, unused_mut)]
            fn invoke(&self, args: Vec<DynSvc>) -> InjectResult<R> {
                let expected =
                    <Self as Factory<($($type_name,)*), R>>::arguments().len();
                if args.len() != expected {
                    return Err(InjectError::InternalError(format!(
                        "factory for {} takes {} arguments but received {}",
                        ServiceInfo::of::<R>().name(),
                        expected,
                        args.len()
                    )));
                }

                let mut args = args.into_iter();
                Ok(self($(next_argument::<$type_name>(&mut args)?),*))
            }
        }
    };
}

impl_factory!(T0, T1, T2, T3, T4, T5);

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo(Svc<u8>, Svc<String>);

    #[test]
    fn arguments_are_listed_in_order() {
        fn arguments<D, R, F: Factory<D, R>>(_: &F) -> Vec<ServiceInfo> {
            F::arguments()
        }

        assert_eq!(
            vec![ServiceInfo::of::<u8>(), ServiceInfo::of::<String>()],
            arguments(&Foo)
        );
    }

    #[test]
    fn invoke_downcasts_arguments() {
        let args: Vec<DynSvc> =
            vec![Svc::new(3_u8) as DynSvc, Svc::new(String::from("three"))];
        let foo = Factory::<(u8, String), Foo>::invoke(&Foo, args).unwrap();
        assert_eq!(3, *foo.0);
        assert_eq!("three", foo.1.as_str());
    }

    #[test]
    fn invoke_rejects_wrong_argument_types() {
        let args: Vec<DynSvc> = vec![Svc::new(3_u8) as DynSvc, Svc::new(3_u8)];
        match Factory::<(u8, String), Foo>::invoke(&Foo, args) {
            Err(InjectError::TypeMismatch { service_info })
                if service_info == ServiceInfo::of::<String>() => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("arguments of the wrong type were accepted"),
        }
    }

    #[test]
    fn invoke_rejects_wrong_argument_count() {
        let args: Vec<DynSvc> = vec![Svc::new(3_u8) as DynSvc];
        match Factory::<(u8, String), Foo>::invoke(&Foo, args) {
            Err(InjectError::InternalError(_)) => {}
            Err(error) => Err(error).unwrap(),
            Ok(_) => panic!("too few arguments were accepted"),
        }
    }
}
