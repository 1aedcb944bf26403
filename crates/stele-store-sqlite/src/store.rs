//! [`SqliteStorage`] — the SQLite implementation of
//! [`stele_core::store::Storage`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use stele_core::metrics::{MetricsWindow, TEMPLATE_TYPE, TypeFilter};
use stele_core::resource::{ResourceMetadata, SavedResource, VersionEntry};
use stele_core::store::{ResourceQuery, Storage};
use stele_core::user::User;

use crate::{
  Error, Result,
  encode::{
    decode_resource, decode_user, decode_version_entries, encode_dt,
    encode_resource, encode_user, encode_version_entries, encode_version_entry,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stele document store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStorage {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStorage {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Push the SQL condition for a coarse type filter, growing `binds` in step
/// with the placeholder index. `All` adds no condition.
fn type_cond(filter: TypeFilter, binds: &mut Vec<String>) -> Option<String> {
  let exists = |n: usize| {
    format!(
      "EXISTS (SELECT 1 FROM json_each(resources.doc, '$.types')
        WHERE json_each.value = ?{n})"
    )
  };
  match filter {
    TypeFilter::Template => {
      binds.push(TEMPLATE_TYPE.to_owned());
      Some(exists(binds.len()))
    }
    TypeFilter::Resource => {
      binds.push(TEMPLATE_TYPE.to_owned());
      Some(format!("NOT {}", exists(binds.len())))
    }
    TypeFilter::All => None,
  }
}

// ─── Storage impl ────────────────────────────────────────────────────────────

impl Storage for SqliteStorage {
  type Error = Error;

  // ── Primary collection ────────────────────────────────────────────────────

  async fn insert_resource(&self, resource: &SavedResource) -> Result<()> {
    let id = resource.id.clone();
    let group = resource.group.clone();
    let timestamp = encode_dt(resource.timestamp);
    let doc = encode_resource(resource)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO resources (id, owner_group, timestamp, doc)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, group, timestamp, doc],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_resource(&self, id: &str) -> Result<Option<SavedResource>> {
    let id = id.to_owned();

    let doc: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc FROM resources WHERE id = ?1",
              rusqlite::params![id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    doc.as_deref().map(decode_resource).transpose()
  }

  async fn replace_resource(&self, resource: &SavedResource) -> Result<u64> {
    let id = resource.id.clone();
    let group = resource.group.clone();
    let timestamp = encode_dt(resource.timestamp);
    let doc = encode_resource(resource)?;

    let matched = self
      .conn
      .call(move |conn| {
        let matched = conn.execute(
          "UPDATE resources SET owner_group = ?2, timestamp = ?3, doc = ?4
           WHERE id = ?1",
          rusqlite::params![id, group, timestamp, doc],
        )?;
        Ok(matched as u64)
      })
      .await?;
    Ok(matched)
  }

  async fn remove_resource(&self, id: &str) -> Result<u64> {
    let id = id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let deleted = conn
          .execute("DELETE FROM resources WHERE id = ?1", rusqlite::params![id])?;
        Ok(deleted as u64)
      })
      .await?;
    Ok(deleted)
  }

  async fn list_resources(
    &self,
    query: &ResourceQuery,
    skip: u64,
    limit: u64,
  ) -> Result<Vec<SavedResource>> {
    // Conditions and bindings grow together so placeholder indices stay in
    // step. skip/limit are plain integers and interpolate directly.
    let mut conds: Vec<String> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(group) = &query.group {
      binds.push(group.clone());
      conds.push(format!("owner_group = ?{}", binds.len()));
    }
    if let Some(resource_type) = &query.resource_type {
      binds.push(resource_type.clone());
      conds.push(format!(
        "EXISTS (SELECT 1 FROM json_each(resources.doc, '$.types')
          WHERE json_each.value = ?{})",
        binds.len()
      ));
    }
    if let Some(after) = query.updated_after {
      binds.push(encode_dt(after));
      conds.push(format!("timestamp >= ?{}", binds.len()));
    }
    if let Some(before) = query.updated_before {
      binds.push(encode_dt(before));
      conds.push(format!("timestamp <= ?{}", binds.len()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT doc FROM resources {where_clause}
       ORDER BY rowid LIMIT {limit} OFFSET {skip}"
    );

    let docs: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(binds.iter()), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs.iter().map(|doc| decode_resource(doc)).collect()
  }

  async fn find_resources_referencing(
    &self,
    uri: &str,
  ) -> Result<Vec<SavedResource>> {
    let uri = uri.to_owned();

    let docs: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT doc FROM resources WHERE
             EXISTS (SELECT 1 FROM json_each(resources.doc, '$.bfAdminMetadataRefs')
               WHERE json_each.value = ?1)
             OR EXISTS (SELECT 1 FROM json_each(resources.doc, '$.bfItemRefs')
               WHERE json_each.value = ?1)
             OR EXISTS (SELECT 1 FROM json_each(resources.doc, '$.bfInstanceRefs')
               WHERE json_each.value = ?1)
             OR EXISTS (SELECT 1 FROM json_each(resources.doc, '$.bfWorkRefs')
               WHERE json_each.value = ?1)
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![uri], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs.iter().map(|doc| decode_resource(doc)).collect()
  }

  // ── Version collection ────────────────────────────────────────────────────

  async fn insert_version(&self, resource: &SavedResource) -> Result<()> {
    let id = resource.id.clone();
    let timestamp = encode_dt(resource.timestamp);
    let doc = encode_resource(resource)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO resource_versions (id, timestamp, doc)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id, timestamp, doc],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_version(
    &self,
    id: &str,
    timestamp: DateTime<Utc>,
  ) -> Result<Option<SavedResource>> {
    let id = id.to_owned();
    let timestamp = encode_dt(timestamp);

    let doc: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc FROM resource_versions
               WHERE id = ?1 AND timestamp = ?2",
              rusqlite::params![id, timestamp],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    doc.as_deref().map(decode_resource).transpose()
  }

  async fn remove_versions(&self, id: &str) -> Result<()> {
    let id = id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM resource_versions WHERE id = ?1",
          rusqlite::params![id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Metadata collection ───────────────────────────────────────────────────

  async fn insert_metadata(&self, metadata: &ResourceMetadata) -> Result<()> {
    let id = metadata.id.clone();
    let versions = encode_version_entries(&metadata.versions)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO resource_metadata (id, versions) VALUES (?1, ?2)",
          rusqlite::params![id, versions],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_metadata(&self, id: &str) -> Result<Option<ResourceMetadata>> {
    let id_param = id.to_owned();

    let versions: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT versions FROM resource_metadata WHERE id = ?1",
              rusqlite::params![id_param],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    versions
      .as_deref()
      .map(|doc| {
        Ok(ResourceMetadata {
          id:       id.to_owned(),
          versions: decode_version_entries(doc)?,
        })
      })
      .transpose()
  }

  async fn last_version_entry(&self, id: &str) -> Result<Option<VersionEntry>> {
    Ok(
      self
        .find_metadata(id)
        .await?
        .and_then(|metadata| metadata.versions.into_iter().next_back()),
    )
  }

  async fn append_version_entry(
    &self,
    id: &str,
    entry: &VersionEntry,
  ) -> Result<()> {
    let id = id.to_owned();
    let entry_json = encode_version_entry(entry)?;

    self
      .conn
      .call(move |conn| {
        // json_insert with '$[#]' appends to the array in place.
        conn.execute(
          "UPDATE resource_metadata
           SET versions = json_insert(versions, '$[#]', json(?2))
           WHERE id = ?1",
          rusqlite::params![id, entry_json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_metadata(&self, id: &str) -> Result<()> {
    let id = id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM resource_metadata WHERE id = ?1",
          rusqlite::params![id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, user: &User) -> Result<()> {
    let id = user.id.clone();
    let doc = encode_user(user)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (id, doc) VALUES (?1, ?2)",
          rusqlite::params![id, doc],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_user(&self, id: &str) -> Result<Option<User>> {
    let id = id.to_owned();

    let doc: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc FROM users WHERE id = ?1",
              rusqlite::params![id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    doc.as_deref().map(decode_user).transpose()
  }

  async fn replace_user(&self, user: &User) -> Result<u64> {
    let id = user.id.clone();
    let doc = encode_user(user)?;

    let matched = self
      .conn
      .call(move |conn| {
        let matched = conn.execute(
          "UPDATE users SET doc = ?2 WHERE id = ?1",
          rusqlite::params![id, doc],
        )?;
        Ok(matched as u64)
      })
      .await?;
    Ok(matched)
  }

  // ── Metrics ───────────────────────────────────────────────────────────────

  async fn count_users(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn count_resources(&self, filter: TypeFilter) -> Result<u64> {
    let mut binds: Vec<String> = Vec::new();
    let where_clause = match type_cond(filter, &mut binds) {
      Some(cond) => format!("WHERE {cond}"),
      None => String::new(),
    };
    let sql = format!("SELECT COUNT(*) FROM resources {where_clause}");

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(binds.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn count_created(
    &self,
    filter: TypeFilter,
    window: &MetricsWindow,
  ) -> Result<u64> {
    // Only the first audit entry decides creation time. Version-entry
    // timestamps carry variable subsecond width, so both comparison sides
    // are normalised through strftime.
    let mut binds: Vec<String> = Vec::new();
    let mut conds: Vec<String> = Vec::new();
    if let Some(cond) = type_cond(filter, &mut binds) {
      conds.push(cond);
    }
    binds.push(encode_dt(window.start));
    conds.push(format!(
      "strftime('%Y-%m-%d %H:%M:%f',
         json_extract(resource_metadata.versions, '$[0].timestamp'))
       > strftime('%Y-%m-%d %H:%M:%f', ?{})",
      binds.len()
    ));
    binds.push(encode_dt(window.end));
    conds.push(format!(
      "strftime('%Y-%m-%d %H:%M:%f',
         json_extract(resource_metadata.versions, '$[0].timestamp'))
       < strftime('%Y-%m-%d %H:%M:%f', ?{})",
      binds.len()
    ));
    if let Some(group) = &window.group {
      binds.push(group.clone());
      conds.push(format!("resources.owner_group = ?{}", binds.len()));
    }

    let sql = format!(
      "SELECT COUNT(*) FROM resources
       JOIN resource_metadata ON resource_metadata.id = resources.id
       WHERE {}",
      conds.join(" AND ")
    );

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(binds.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn count_edited(
    &self,
    filter: TypeFilter,
    window: &MetricsWindow,
  ) -> Result<u64> {
    // Any audit entry in the window qualifies; one metadata row per
    // resource keeps the count distinct by id.
    let mut binds: Vec<String> = Vec::new();
    let mut conds: Vec<String> = Vec::new();
    if let Some(cond) = type_cond(filter, &mut binds) {
      conds.push(cond);
    }
    binds.push(encode_dt(window.start));
    let start_idx = binds.len();
    binds.push(encode_dt(window.end));
    let end_idx = binds.len();
    conds.push(format!(
      "EXISTS (SELECT 1 FROM json_each(resource_metadata.versions)
        WHERE strftime('%Y-%m-%d %H:%M:%f',
                json_extract(json_each.value, '$.timestamp'))
              > strftime('%Y-%m-%d %H:%M:%f', ?{start_idx})
          AND strftime('%Y-%m-%d %H:%M:%f',
                json_extract(json_each.value, '$.timestamp'))
              < strftime('%Y-%m-%d %H:%M:%f', ?{end_idx}))"
    ));
    if let Some(group) = &window.group {
      binds.push(group.clone());
      conds.push(format!("resources.owner_group = ?{}", binds.len()));
    }

    let sql = format!(
      "SELECT COUNT(*) FROM resources
       JOIN resource_metadata ON resource_metadata.id = resources.id
       WHERE {}",
      conds.join(" AND ")
    );

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(binds.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }
}
