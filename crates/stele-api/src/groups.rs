//! Handler for the `/groups` directory.
//!
//! The directory is a static list for now; it will eventually be sourced
//! from the identity provider.

use axum::Json;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct Group {
  pub id:    &'static str,
  pub label: &'static str,
}

pub const GROUPS: &[Group] = &[
  Group { id: "alberta", label: "University of Alberta" },
  Group { id: "boulder", label: "University of Colorado, Boulder" },
  Group { id: "chicago", label: "University of Chicago" },
  Group { id: "cornell", label: "Cornell University" },
  Group { id: "dlc", label: "Library of Congress" },
  Group { id: "duke", label: "Duke University" },
  Group { id: "frick", label: "Frick Art Reference Library" },
  Group { id: "harvard", label: "Harvard University" },
  Group { id: "hrc", label: "University of Texas, Austin, Harry Ransom Center" },
  Group { id: "ld4p", label: "LD4P" },
  Group { id: "michigan", label: "University of Michigan" },
  Group { id: "minnesota", label: "University of Minnesota" },
  Group { id: "mla", label: "Music Library Association" },
  Group { id: "nlm", label: "National Library of Medicine" },
  Group { id: "northwestern", label: "Northwestern University" },
  Group { id: "other", label: "Other" },
  Group { id: "pcc", label: "PCC" },
  Group { id: "penn", label: "University of Pennsylvania" },
  Group { id: "princeton", label: "Princeton University" },
  Group { id: "stanford", label: "Stanford University" },
  Group { id: "tamu", label: "Texas A&M University" },
  Group { id: "ucdavis", label: "University of California, Davis" },
  Group { id: "ucsd", label: "University of California, San Diego" },
  Group { id: "washington", label: "University of Washington" },
  Group { id: "yale", label: "Yale University" },
];

/// `GET /groups`
pub async fn list() -> Json<serde_json::Value> {
  Json(json!({ "data": GROUPS }))
}
