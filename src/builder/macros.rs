//! Macros for ergonomic state enum definitions.

/// Define a fieldless enum and implement [`StateId`](crate::core::StateId)
/// for it.
///
/// Variants may carry explicit discriminants; they are the identifiers
/// the machine stores and replicates, so keep them stable across builds.
///
/// # Example
///
/// ```
/// use retrostate::core::StateId;
/// use retrostate::state_enum;
///
/// state_enum! {
///     pub enum Movement {
///         Idle = 0,
///         Run = 1,
///         Jump = 5,
///     }
/// }
///
/// assert_eq!(Movement::Jump.to_i32(), 5);
/// assert_eq!(Movement::from_i32(1), Some(Movement::Run));
/// assert_eq!(Movement::from_i32(2), None);
/// assert_eq!(Movement::Jump.name(), "Jump");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $value:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(= $value)?
            ),*
        }

        impl $crate::core::StateId for $name {
            fn to_i32(self) -> i32 {
                self as i32
            }

            fn from_i32(value: i32) -> Option<Self> {
                $(
                    if value == Self::$variant as i32 {
                        return Some(Self::$variant);
                    }
                )*
                None
            }

            fn variants() -> &'static [Self] {
                &[$(Self::$variant),*]
            }

            fn name(&self) -> String {
                match self {
                    $(Self::$variant => stringify!($variant).to_string()),*
                }
            }
        }
    };
}
