//! Strongly-typed identifiers.
//!
//! Content ids come from the content store; status keys are assigned by the
//! progress store when a status node is first written. Both are positive
//! 64-bit integers, but each level gets its own type so a lesson id can never
//! be passed where an exercise id is expected.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident, $label:literal) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(try_from = "i64", into = "i64")]
    pub struct $name(i64);

    impl $name {
      /// Wrap a raw id, rejecting zero and negative values.
      pub fn new(raw: i64) -> Result<Self> {
        if raw > 0 {
          Ok(Self(raw))
        } else {
          Err(Error::InvalidIdentifier(format!(
            concat!($label, " must be positive, got {}"),
            raw
          )))
        }
      }

      pub fn get(self) -> i64 { self.0 }
    }

    impl TryFrom<i64> for $name {
      type Error = Error;

      fn try_from(raw: i64) -> Result<Self> { Self::new(raw) }
    }

    impl From<$name> for i64 {
      fn from(id: $name) -> i64 { id.0 }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().parse::<i64>().map_err(|_| {
          Error::InvalidIdentifier(format!(concat!($label, " {:?} is not a number"), s))
        })?;
        Self::new(raw)
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }
  };
}

// ─── Identity ────────────────────────────────────────────────────────────────

id_type!(
  /// The client (end user) a progress tree belongs to.
  ClientId,
  "client id"
);

// ─── Content ids ─────────────────────────────────────────────────────────────

id_type!(CourseId, "course id");
id_type!(ClassId, "class id");
id_type!(LessonId, "lesson id");
id_type!(ExerciseId, "exercise id");

// ─── Status node keys ────────────────────────────────────────────────────────

id_type!(
  /// Row key of a [`CourseStatus`](crate::progress::CourseStatus); the parent
  /// key of its class statuses.
  CourseStatusId,
  "course status key"
);
id_type!(ClassStatusId, "class status key");
id_type!(LessonStatusId, "lesson status key");
id_type!(ExerciseStatusId, "exercise status key");

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_positive_ids() {
    let id: LessonId = "100".parse().unwrap();
    assert_eq!(id.get(), 100);
    assert_eq!(id.to_string(), "100");
  }

  #[test]
  fn rejects_malformed_ids() {
    assert!(matches!("abc".parse::<CourseId>(), Err(Error::InvalidIdentifier(_))));
    assert!(matches!("0".parse::<CourseId>(), Err(Error::InvalidIdentifier(_))));
    assert!(matches!("-4".parse::<ClassId>(), Err(Error::InvalidIdentifier(_))));
    assert!(matches!("".parse::<ExerciseId>(), Err(Error::InvalidIdentifier(_))));
  }

  #[test]
  fn serde_rejects_non_positive() {
    let ok: ExerciseId = serde_json::from_str("1001").unwrap();
    assert_eq!(ok.get(), 1001);
    assert!(serde_json::from_str::<ExerciseId>("0").is_err());
    assert_eq!(serde_json::to_string(&ok).unwrap(), "1001");
  }
}
