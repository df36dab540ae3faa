use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }
    };
}

id_newtype!(ContextId);
id_newtype!(SurfaceId);
id_newtype!(OverlayId);
id_newtype!(MenuId);

/// Well-known context identities. Addressing is plain string equality on these,
/// so any context can claim any of them.
pub mod contexts {
    pub const BACKGROUND: &str = "background";
    pub const CONTENT: &str = "content";
    pub const LOGIC: &str = "logic";
    pub const SCRAPE: &str = "scrape";
}

impl ContextId {
    pub fn background() -> Self {
        Self::new(contexts::BACKGROUND)
    }

    pub fn content() -> Self {
        Self::new(contexts::CONTENT)
    }

    pub fn logic() -> Self {
        Self::new(contexts::LOGIC)
    }

    pub fn scrape() -> Self {
        Self::new(contexts::SCRAPE)
    }
}

/// Issues overlay ids of the form `<instance>_<unix millis>`.
///
/// Two ids requested within the same millisecond would collide, so the timestamp
/// part is bumped past the last issued value.
#[derive(Debug, Clone)]
pub struct OverlayIdGenerator {
    instance: String,
    last_millis: i64,
}

impl OverlayIdGenerator {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            last_millis: 0,
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn next_id(&mut self) -> OverlayId {
        self.next_at(Utc::now().timestamp_millis())
    }

    pub fn next_at(&mut self, now_millis: i64) -> OverlayId {
        let millis = now_millis.max(self.last_millis + 1);
        self.last_millis = millis;
        OverlayId(format!("{}_{}", self.instance, millis))
    }
}
