use crate::{DynSvc, Service, ServiceInfo, Svc};
use std::fmt::{Debug, Formatter};

/// A single runtime argument: an erased value together with the type it was
/// passed as. The type is the argument's shape when matching definitions.
#[derive(Clone)]
pub struct Argument {
    service_info: ServiceInfo,
    value: DynSvc,
}

impl Argument {
    /// Creates an argument from a value.
    pub fn new<T: Service>(value: T) -> Self {
        Argument::from_svc(Svc::new(value))
    }

    /// Creates an argument from an existing service pointer. The pointer is
    /// passed on to the factory as-is, so factories receive the same
    /// instance.
    pub fn from_svc<T: Service>(value: Svc<T>) -> Self {
        Argument {
            service_info: ServiceInfo::of::<T>(),
            value,
        }
    }

    /// Creates an argument from an erased value and an explicit shape. The
    /// shape is not checked against the value until a factory downcasts it.
    #[must_use]
    pub fn from_dyn(service_info: ServiceInfo, value: DynSvc) -> Self {
        Argument {
            service_info,
            value,
        }
    }

    /// The shape of this argument.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// The erased value of this argument.
    #[must_use]
    pub fn value(&self) -> &DynSvc {
        &self.value
    }

    pub(crate) fn into_value(self) -> DynSvc {
        self.value
    }
}

impl Debug for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Argument")
            .field(&self.service_info.name())
            .finish()
    }
}

/// An ordered list of runtime arguments passed to a resolve call.
///
/// ```
/// use graph_injector::{Arguments, ServiceInfo};
///
/// let args = Arguments::new().with(5_u32).with(String::from("five"));
/// assert_eq!(
///     vec![ServiceInfo::of::<u32>(), ServiceInfo::of::<String>()],
///     args.shapes()
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    args: Vec<Argument>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Arguments::default()
    }

    /// Appends an argument.
    #[must_use]
    pub fn with<T: Service>(mut self, value: T) -> Self {
        self.push(Argument::new(value));
        self
    }

    /// Appends an argument that is already behind a service pointer.
    #[must_use]
    pub fn with_svc<T: Service>(mut self, value: Svc<T>) -> Self {
        self.push(Argument::from_svc(value));
        self
    }

    /// Appends an argument.
    pub fn push(&mut self, argument: Argument) {
        self.args.push(argument);
    }

    /// The shapes of the arguments, in order.
    #[must_use]
    pub fn shapes(&self) -> Vec<ServiceInfo> {
        self.args.iter().map(Argument::service_info).collect()
    }

    /// The number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether no arguments were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Iterates over the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.args.iter()
    }

    pub(crate) fn into_values(self) -> Vec<DynSvc> {
        self.args.into_iter().map(Argument::into_value).collect()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Arguments {
            args: iter.into_iter().collect(),
        }
    }
}

/// Conversion of a tuple of values into runtime [`Arguments`]. Implemented
/// for tuples of up to six services, matching the factory arities.
pub trait IntoArguments {
    /// Converts this value into arguments.
    fn into_arguments(self) -> Arguments;
}

impl IntoArguments for Arguments {
    fn into_arguments(self) -> Arguments {
        self
    }
}

macro_rules! impl_into_arguments {
    () => {
        impl_into_arguments!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_into_arguments!(@impl ($first $(, $rest)*));
        impl_into_arguments!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl <$($type_name),*> IntoArguments for ($($type_name,)*)
        where
            $($type_name: Service,)*
        {
            #[allow(non_snake_case, unused_mut)]
            fn into_arguments(self) -> Arguments {
                let ($($type_name,)*) = self;
                let mut args = Arguments::new();
                $(args.push(Argument::new($type_name));)*
                args
            }
        }
    };
}

impl_into_arguments!(T0, T1, T2, T3, T4, T5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuples_keep_their_order() {
        let args = (1_u8, "two", 3_i64).into_arguments();
        assert_eq!(
            vec![
                ServiceInfo::of::<u8>(),
                ServiceInfo::of::<&'static str>(),
                ServiceInfo::of::<i64>(),
            ],
            args.shapes()
        );
    }

    #[test]
    fn shared_arguments_keep_identity() {
        let value = Svc::new(String::from("shared"));
        let args = Arguments::new().with_svc(value.clone());
        let passed = args.into_values().remove(0);
        let passed = passed.downcast::<String>().unwrap();
        assert!(Svc::ptr_eq(&value, &passed));
    }
}
