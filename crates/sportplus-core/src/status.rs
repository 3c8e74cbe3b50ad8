//! The status value carried by every node of a progress tree.
//!
//! The wire and storage representation is the literal Russian label used by
//! the mobile clients; the enum exists so the rest of the code never compares
//! strings.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Status {
  #[default]
  #[serde(rename = "Не начато")]
  NotStarted,
  #[serde(rename = "В процессе")]
  InProgress,
  #[serde(rename = "Завершено")]
  Completed,
}

impl Status {
  pub const ALL: [Status; 3] = [Self::NotStarted, Self::InProgress, Self::Completed];

  /// The exact label accepted and emitted at every boundary.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::NotStarted => "Не начато",
      Self::InProgress => "В процессе",
      Self::Completed => "Завершено",
    }
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| Error::UnknownStatus(s.to_owned()))
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_match_serde_names() {
    for status in Status::ALL {
      let json = serde_json::to_string(&status).unwrap();
      assert_eq!(json, format!("\"{}\"", status.as_str()));
      assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
    }
  }

  #[test]
  fn rejects_english_and_unknown_labels() {
    assert!(matches!("NotStarted".parse::<Status>(), Err(Error::UnknownStatus(_))));
    assert!(matches!("завершено".parse::<Status>(), Err(Error::UnknownStatus(_))));
    assert!(serde_json::from_str::<Status>("\"Completed\"").is_err());
  }

  #[test]
  fn default_is_not_started() {
    assert_eq!(Status::default(), Status::NotStarted);
  }
}
