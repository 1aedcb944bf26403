//! The permission evaluator.
//!
//! Pure decision functions: every input (caller identity, policy, persisted
//! ownership) is passed in explicitly so the rules are testable without
//! storage. The [`Repository`](crate::Repository) fetches persisted ownership
//! fresh — never from the request body — before calling in here.
//!
//! Fixed rejection messages are part of the API contract and are matched
//! verbatim by clients (grammar and all).

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::resource::VersionEntry;

/// Rejection messages, fixed per the API contract.
pub const NOT_IN_GROUP: &str = "User must a member of the resource's group";
pub const NOT_IN_NEW_GROUP: &str = "User must a member of the new group";
pub const NOT_IN_GROUP_OR_EDIT_GROUPS: &str =
  "User must a member of the resource's group or editGroups";
pub const NOT_IN_TARGET_GROUP: &str =
  "User must a member of the group to which the resource is being transferred";

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// An authenticated caller: a username and the groups the identity provider
/// vouches for.
#[derive(Debug, Clone, Default)]
pub struct Agent {
  pub username: String,
  pub groups:   Vec<String>,
}

/// Evaluation policy, threaded in from configuration rather than read as
/// ambient state.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessPolicy {
  /// Global override disabling all permission checks. A migration/testing
  /// escape hatch; every bypass is logged.
  #[serde(default)]
  pub no_auth:     bool,
  /// Membership in this group satisfies any group-membership check.
  #[serde(default = "default_admin_group")]
  pub admin_group: String,
}

fn default_admin_group() -> String { "admin".to_owned() }

impl Default for AccessPolicy {
  fn default() -> Self {
    Self { no_auth: false, admin_group: default_admin_group() }
  }
}

impl AccessPolicy {
  fn is_member(&self, agent: &Agent, group: &str) -> bool {
    agent.groups.iter().any(|g| g == group)
      || agent.groups.iter().any(|g| *g == self.admin_group)
  }

  fn intersects(&self, agent: &Agent, groups: &[String]) -> bool {
    agent.groups.iter().any(|g| groups.contains(g))
      || agent.groups.iter().any(|g| *g == self.admin_group)
  }

  /// True when the global no-auth override applies; logged on every use so
  /// the bypass is auditable.
  fn bypassed(&self, operation: &str) -> bool {
    if self.no_auth {
      tracing::warn!(operation, "permission check bypassed: no-auth mode");
      return true;
    }
    false
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// May `agent` create a resource owned by `requested_group`?
pub fn can_create(
  policy: &AccessPolicy,
  agent: Option<&Agent>,
  requested_group: &str,
) -> Result<()> {
  if policy.bypassed("create") {
    return Ok(());
  }
  let agent = authenticated(agent)?;
  if !policy.is_member(agent, requested_group) {
    return Err(Error::Unauthorized(NOT_IN_GROUP.to_owned()));
  }
  Ok(())
}

/// May `agent` write a new version, given the resource's last persisted
/// version entry and the ownership fields requested in the body?
///
/// Ownership transfer (any change to `group` or `editGroups`) requires
/// membership in the *current* owning group; moving to a new group
/// additionally requires membership in that group. A no-transfer edit needs
/// membership in the owning group or a non-trivial intersection with
/// `editGroups`.
pub fn can_edit(
  policy: &AccessPolicy,
  agent: Option<&Agent>,
  last: &VersionEntry,
  requested_group: &str,
  requested_edit_groups: &[String],
) -> Result<()> {
  if policy.bypassed("edit") {
    return Ok(());
  }
  let agent = authenticated(agent)?;

  let group_changed = requested_group != last.group;
  let edit_groups_changed = requested_edit_groups != last.edit_groups;

  if (group_changed || edit_groups_changed)
    && !policy.is_member(agent, &last.group)
  {
    return Err(Error::Unauthorized(NOT_IN_GROUP.to_owned()));
  }
  if group_changed && !policy.is_member(agent, requested_group) {
    return Err(Error::Unauthorized(NOT_IN_NEW_GROUP.to_owned()));
  }
  if !policy.is_member(agent, &last.group)
    && !policy.intersects(agent, &last.edit_groups)
  {
    return Err(Error::Unauthorized(NOT_IN_GROUP_OR_EDIT_GROUPS.to_owned()));
  }
  Ok(())
}

/// May `agent` delete a resource currently owned by `current_group`?
pub fn can_delete(
  policy: &AccessPolicy,
  agent: Option<&Agent>,
  current_group: &str,
) -> Result<()> {
  if policy.bypassed("delete") {
    return Ok(());
  }
  let agent = authenticated(agent)?;
  if !policy.is_member(agent, current_group) {
    return Err(Error::Unauthorized(NOT_IN_GROUP.to_owned()));
  }
  Ok(())
}

/// May `agent` transfer a resource to `target_group`?
pub fn can_transfer(
  policy: &AccessPolicy,
  agent: Option<&Agent>,
  target_group: &str,
) -> Result<()> {
  if policy.bypassed("transfer") {
    return Ok(());
  }
  let agent = authenticated(agent)?;
  if !policy.is_member(agent, target_group) {
    return Err(Error::Unauthorized(NOT_IN_TARGET_GROUP.to_owned()));
  }
  Ok(())
}

fn authenticated(agent: Option<&Agent>) -> Result<&Agent> {
  agent.ok_or_else(|| Error::Unauthorized("No authenticated user".to_owned()))
}
