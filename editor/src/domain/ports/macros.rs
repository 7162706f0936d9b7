//! Helper macro for declaring port error enums.
//!
//! Every variant gets a snake_case constructor whose parameters accept
//! `impl Into<FieldType>`. An optional `retryable [..]` clause lists the
//! variants for which `is_retryable` returns `true`.

macro_rules! define_port_error {
    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            #[doc = concat!("Build a `", stringify!($variant), "` error.")]
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $($field:ident : $ty:ty),* $(,)? } => $message:expr
            ),* $(,)?
        }
        $(retryable [$($retryable:ident),* $(,)?])?
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant { $($field : $ty),* },
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant { $($field : $ty),* });
            )*

            const RETRYABLE: &'static [&'static str] = &[$($(stringify!($retryable)),*)?];

            /// Variant name, as written in the declaration.
            pub const fn variant_name(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant),)*
                }
            }

            /// Whether repeating the call may succeed.
            pub fn is_retryable(&self) -> bool {
                Self::RETRYABLE.contains(&self.variant_name())
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Coverage for generated constructors and retry classification.

    define_port_error! {
        pub enum RemoteError {
            Flaky { message: String } => "flaky: {message}",
            Refused { status: u16, message: String } => "refused {status}: {message}",
        }
        retryable [Flaky]
    }

    define_port_error! {
        pub enum FatalOnlyError {
            Broken { message: String } => "broken: {message}",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        assert_eq!(RemoteError::flaky("socket reset").to_string(), "flaky: socket reset");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let error = RemoteError::refused(403_u16, "forbidden");
        assert_eq!(error.to_string(), "refused 403: forbidden");
    }

    #[test]
    fn variant_names_match_declarations() {
        assert_eq!(RemoteError::flaky("x").variant_name(), "Flaky");
        assert_eq!(FatalOnlyError::broken("x").variant_name(), "Broken");
    }

    #[test]
    fn retryable_clause_classifies_variants() {
        assert!(RemoteError::flaky("x").is_retryable());
        assert!(!RemoteError::refused(400_u16, "x").is_retryable());
        assert!(!FatalOnlyError::broken("x").is_retryable());
    }
}
