//! Dense typed handles for model entities.

macro_rules! define_id_type {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an ID from a u32 value.
            pub fn new(value: u32) -> Self {
                Self(value)
            }

            /// Get the inner u32 value.
            pub fn inner(self) -> u32 {
                self.0
            }

            /// Position of the entity in dense solver vectors.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

define_id_type!(VariableId, "var");
define_id_type!(ConstraintId, "row");

#[cfg(test)]
mod tests {
    use super::{ConstraintId, VariableId};

    #[test]
    fn variable_id_exposes_dense_index() {
        let id = VariableId::new(7);
        assert_eq!(id.inner(), 7);
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn ids_render_with_kind_prefix() {
        assert_eq!(VariableId::new(3).to_string(), "var#3");
        assert_eq!(ConstraintId::new(11).to_string(), "row#11");
    }
}
