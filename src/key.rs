use crate::ServiceInfo;
use derive_more::Display;
use std::fmt::{Debug, Formatter};

/// A discriminator used to register several definitions of the same type.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum Tag {
    /// A tag named by a string.
    #[display(fmt = "{:?}", _0)]
    String(String),

    /// A tag named by an integer.
    #[display(fmt = "{}", _0)]
    Int(i64),
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_owned())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::String(value)
    }
}

impl From<i64> for Tag {
    fn from(value: i64) -> Self {
        Tag::Int(value)
    }
}

/// Identifies a definition: the type it produces, an optional tag, and the
/// ordered types of the arguments its factory takes.
///
/// Argument order is significant. A factory taking `(A, B)` is registered
/// under a different key than one taking `(B, A)`.
///
/// ```
/// use graph_injector::{Key, ServiceInfo};
///
/// let ab = Key::new(
///     ServiceInfo::of::<String>(),
///     None,
///     vec![ServiceInfo::of::<u8>(), ServiceInfo::of::<u16>()],
/// );
/// let ba = Key::new(
///     ServiceInfo::of::<String>(),
///     None,
///     vec![ServiceInfo::of::<u16>(), ServiceInfo::of::<u8>()],
/// );
/// assert_ne!(ab, ba);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    service_info: ServiceInfo,
    tag: Option<Tag>,
    args: Vec<ServiceInfo>,
}

impl Key {
    /// Creates a new key.
    #[must_use]
    pub fn new(
        service_info: ServiceInfo,
        tag: Option<Tag>,
        args: Vec<ServiceInfo>,
    ) -> Self {
        Key {
            service_info,
            tag,
            args,
        }
    }

    /// The type produced by the definition.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// The tag of the definition, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// The argument types of the definition's factory, in order.
    #[must_use]
    pub fn args(&self) -> &[ServiceInfo] {
        &self.args
    }

    /// The number of arguments the definition's factory takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Returns the same key without a tag.
    #[must_use]
    pub(crate) fn untagged(&self) -> Self {
        Key {
            service_info: self.service_info,
            tag: None,
            args: self.args.clone(),
        }
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let args: Vec<_> = self.args.iter().map(ServiceInfo::name).collect();
        f.debug_struct("Key")
            .field("service", &self.service_info.name())
            .field("tag", &self.tag)
            .field("args", &args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_part_of_the_key() {
        let untagged = Key::new(ServiceInfo::of::<u8>(), None, Vec::new());
        let tagged =
            Key::new(ServiceInfo::of::<u8>(), Some("a".into()), Vec::new());
        assert_ne!(untagged, tagged);
        assert_eq!(untagged, tagged.untagged());
    }

    #[test]
    fn string_and_int_tags_differ() {
        assert_ne!(Tag::from("1"), Tag::from(1_i64));
        assert_eq!("\"a\"", Tag::from("a").to_string());
        assert_eq!("7", Tag::from(7_i64).to_string());
    }
}
