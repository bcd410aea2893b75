//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh, time-ordered identifier.
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::try_parse(s.trim()).map(Self)
            }
        }
    };
}

typed_id!(
    /// Account identifier.
    AccountId
);
typed_id!(
    /// Menu item identifier.
    MenuItemId
);
typed_id!(
    /// Review identifier.
    ReviewId
);
typed_id!(
    /// Cart line item identifier.
    CartItemId
);
typed_id!(
    /// Payment identifier.
    PaymentId
);
