use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::config::CatalogConfig;
use crate::db::catalog_models::*;
use crate::db::catalog_schema::{
    collection_ebooks, collections, contributors, ebook_loc_subjects, ebook_sources, ebook_tags,
    ebooks, git_commits, loc_subjects, tags, toc_entries,
};
use crate::db::DatabaseHandle;
use crate::ebook::derived::compute_derived;
use crate::ebook::model::{
    Collection, CollectionMembership, CommitRecord, Contributor, DerivedFields, DownloadUrls,
    EbookRecord, EbookSource, LocSubject, Tag,
};
use crate::error::CatalogError;
use crate::logger::{debug, info};
use crate::types::{CollectionType, ContributorRole, SourceType};

pub type CatalogDbHandle = DatabaseHandle;

/// The child rows of one ebook, in persisted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EbookRecordParts {
    pub authors: Vec<Contributor>,
    pub illustrators: Vec<Contributor>,
    pub translators: Vec<Contributor>,
    pub contributors: Vec<Contributor>,
    pub tags: Vec<Tag>,
    pub loc_subjects: Vec<LocSubject>,
    pub collections: Vec<CollectionMembership>,
    pub sources: Vec<EbookSource>,
    pub git_commits: Vec<CommitRecord>,
    pub toc_entries: Vec<String>,
}

fn to_naive(dt: Option<DateTime<Utc>>) -> Option<NaiveDateTime> {
    dt.map(|d| d.naive_utc())
}

fn duplicate_or_database(e: DieselError, identifier: &str) -> CatalogError {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            CatalogError::Duplicate(identifier.to_string())
        }
        e => CatalogError::Database(e),
    }
}

struct EbookPaths {
    www: String,
    repo: String,
}

impl EbookPaths {
    fn of(record: &EbookRecord) -> Self {
        EbookPaths {
            www: record.www_filesystem_path.to_string_lossy().to_string(),
            repo: record.repo_filesystem_path.to_string_lossy().to_string(),
        }
    }
}

fn new_ebook_row<'a>(record: &'a EbookRecord, paths: &'a EbookPaths) -> NewCatalogEbook<'a> {
    let d = &record.downloads;
    NewCatalogEbook {
        identifier: &record.identifier,
        www_filesystem_path: &paths.www,
        repo_filesystem_path: &paths.repo,
        url: &record.derived.url,
        title: &record.title,
        full_title: record.full_title.as_deref(),
        alternate_title: record.alternate_title.as_deref(),
        description: record.description.as_deref(),
        long_description: record.long_description.as_deref(),
        language: record.language.as_deref(),
        word_count: record.word_count,
        reading_ease: record.reading_ease,
        github_url: record.github_url.as_deref(),
        wikipedia_url: record.wikipedia_url.as_deref(),
        kindle_cover_url: d.kindle_cover_url.as_deref(),
        epub_url: d.epub_url.as_deref(),
        advanced_epub_url: d.advanced_epub_url.as_deref(),
        kepub_url: d.kepub_url.as_deref(),
        azw3_url: d.azw3_url.as_deref(),
        dist_cover_url: d.dist_cover_url.as_deref(),
        text_single_page_byte_count: record.text_single_page_byte_count,
        indexable_text: &record.derived.indexable_text,
        has_toc: record.toc_entries.is_some(),
        ebook_created: to_naive(record.ebook_created),
        ebook_updated: to_naive(record.ebook_updated),
        updated_at: Utc::now().naive_utc(),
    }
}

fn find_ebook_id(conn: &mut SqliteConnection, identifier: &str) -> Result<Option<i32>, DieselError> {
    ebooks::table
        .filter(ebooks::identifier.eq(identifier))
        .select(ebooks::id)
        .first::<i32>(conn)
        .optional()
}

fn get_or_create_tag(conn: &mut SqliteConnection, tag: &Tag) -> Result<i32, DieselError> {
    if let Some(id) = tags::table
        .filter(tags::url_name.eq(&tag.url_name))
        .select(tags::id)
        .first::<i32>(conn)
        .optional()?
    {
        return Ok(id);
    }

    diesel::insert_into(tags::table)
        .values(&NewCatalogTag { name: &tag.name, url_name: &tag.url_name })
        .returning(tags::id)
        .get_result(conn)
}

fn get_or_create_loc_subject(conn: &mut SqliteConnection, subject: &LocSubject) -> Result<i32, DieselError> {
    if let Some(id) = loc_subjects::table
        .filter(loc_subjects::name.eq(&subject.name))
        .select(loc_subjects::id)
        .first::<i32>(conn)
        .optional()?
    {
        return Ok(id);
    }

    diesel::insert_into(loc_subjects::table)
        .values(&NewCatalogLocSubject { name: &subject.name })
        .returning(loc_subjects::id)
        .get_result(conn)
}

/// Collections are shared across titles by URL name. The first persisted
/// display name is kept.
fn get_or_create_collection(conn: &mut SqliteConnection, collection: &Collection) -> Result<i32, DieselError> {
    if let Some(id) = collections::table
        .filter(collections::url_name.eq(&collection.url_name))
        .select(collections::id)
        .first::<i32>(conn)
        .optional()?
    {
        return Ok(id);
    }

    diesel::insert_into(collections::table)
        .values(&NewCatalogCollection { name: &collection.name, url_name: &collection.url_name })
        .returning(collections::id)
        .get_result(conn)
}

fn insert_children(conn: &mut SqliteConnection, ebook_id: i32, record: &EbookRecord) -> Result<(), DieselError> {
    let new_contributors: Vec<NewCatalogContributor> = record.all_contributors()
        .enumerate()
        .map(|(i, c)| NewCatalogContributor {
            ebook_id,
            name: &c.name,
            url_name: &c.url_name,
            sort_name: c.sort_name.as_deref(),
            full_name: c.full_name.as_deref(),
            wikipedia_url: c.wikipedia_url.as_deref(),
            nacoaf_url: c.nacoaf_url.as_deref(),
            marc_role: c.role.marc_code(),
            sort_order: i as i32,
        })
        .collect();
    if !new_contributors.is_empty() {
        diesel::insert_into(contributors::table).values(&new_contributors).execute(conn)?;
    }

    let mut seen = HashSet::new();
    for (i, tag) in record.tags.iter().enumerate() {
        let tag_id = get_or_create_tag(conn, tag)?;
        if seen.insert(tag_id) {
            diesel::insert_into(ebook_tags::table)
                .values(&NewEbookTag { ebook_id, tag_id, sort_order: i as i32 })
                .execute(conn)?;
        }
    }

    let mut seen = HashSet::new();
    for (i, subject) in record.loc_subjects.iter().enumerate() {
        let loc_subject_id = get_or_create_loc_subject(conn, subject)?;
        if seen.insert(loc_subject_id) {
            diesel::insert_into(ebook_loc_subjects::table)
                .values(&NewEbookLocSubject { ebook_id, loc_subject_id, sort_order: i as i32 })
                .execute(conn)?;
        }
    }

    let mut seen = HashSet::new();
    for (i, cm) in record.collections.iter().enumerate() {
        let collection_id = get_or_create_collection(conn, &cm.collection)?;
        if seen.insert(collection_id) {
            diesel::insert_into(collection_ebooks::table)
                .values(&NewCollectionEbook {
                    ebook_id,
                    collection_id,
                    sequence_number: cm.sequence_number,
                    collection_type: cm.collection_type.map(|t| t.as_str()),
                    sort_order: i as i32,
                })
                .execute(conn)?;
        }
    }

    let new_commits: Vec<NewCatalogCommit> = record.git_commits.iter()
        .enumerate()
        .map(|(i, c)| NewCatalogCommit {
            ebook_id,
            created: c.created.naive_utc(),
            hash: &c.hash,
            message: &c.message,
            sort_order: i as i32,
        })
        .collect();
    if !new_commits.is_empty() {
        diesel::insert_into(git_commits::table).values(&new_commits).execute(conn)?;
    }

    let new_sources: Vec<NewCatalogSource> = record.sources.iter()
        .enumerate()
        .map(|(i, s)| NewCatalogSource {
            ebook_id,
            source_type: s.source_type.as_str(),
            url: &s.url,
            sort_order: i as i32,
        })
        .collect();
    if !new_sources.is_empty() {
        diesel::insert_into(ebook_sources::table).values(&new_sources).execute(conn)?;
    }

    if let Some(entries) = &record.toc_entries {
        let new_entries: Vec<NewCatalogTocEntry> = entries.iter()
            .enumerate()
            .map(|(i, e)| NewCatalogTocEntry { ebook_id, toc_entry: e, sort_order: i as i32 })
            .collect();
        if !new_entries.is_empty() {
            diesel::insert_into(toc_entries::table).values(&new_entries).execute(conn)?;
        }
    }

    Ok(())
}

fn delete_children(conn: &mut SqliteConnection, ebook_id: i32) -> Result<(), DieselError> {
    diesel::delete(contributors::table.filter(contributors::ebook_id.eq(ebook_id))).execute(conn)?;
    diesel::delete(ebook_tags::table.filter(ebook_tags::ebook_id.eq(ebook_id))).execute(conn)?;
    diesel::delete(ebook_loc_subjects::table.filter(ebook_loc_subjects::ebook_id.eq(ebook_id))).execute(conn)?;
    diesel::delete(collection_ebooks::table.filter(collection_ebooks::ebook_id.eq(ebook_id))).execute(conn)?;
    diesel::delete(git_commits::table.filter(git_commits::ebook_id.eq(ebook_id))).execute(conn)?;
    diesel::delete(ebook_sources::table.filter(ebook_sources::ebook_id.eq(ebook_id))).execute(conn)?;
    diesel::delete(toc_entries::table.filter(toc_entries::ebook_id.eq(ebook_id))).execute(conn)?;
    Ok(())
}

fn insert_ebook(conn: &mut SqliteConnection, record: &EbookRecord) -> Result<i32, CatalogError> {
    if find_ebook_id(conn, &record.identifier)?.is_some() {
        return Err(CatalogError::Duplicate(record.identifier.clone()));
    }

    let paths = EbookPaths::of(record);
    let ebook_id = diesel::insert_into(ebooks::table)
        .values(&new_ebook_row(record, &paths))
        .returning(ebooks::id)
        .get_result::<i32>(conn)
        .map_err(|e| duplicate_or_database(e, &record.identifier))?;

    insert_children(conn, ebook_id, record)?;
    Ok(ebook_id)
}

fn replace_ebook(conn: &mut SqliteConnection, ebook_id: i32, record: &EbookRecord) -> Result<i32, CatalogError> {
    let paths = EbookPaths::of(record);
    diesel::update(ebooks::table.find(ebook_id))
        .set(&new_ebook_row(record, &paths))
        .execute(conn)?;

    delete_children(conn, ebook_id)?;
    insert_children(conn, ebook_id, record)?;
    Ok(ebook_id)
}

fn load_contributor(c: CatalogContributor) -> Contributor {
    Contributor {
        role: ContributorRole::from_marc_code(&c.marc_role).unwrap_or(ContributorRole::Contributor),
        name: c.name,
        url_name: c.url_name,
        sort_name: c.sort_name,
        full_name: c.full_name,
        wikipedia_url: c.wikipedia_url,
        nacoaf_url: c.nacoaf_url,
    }
}

pub(crate) fn load_record_parts(conn: &mut SqliteConnection, ebook_id: i32) -> Result<EbookRecordParts, DieselError> {
    let mut parts = EbookRecordParts::default();

    let contributor_rows: Vec<CatalogContributor> = contributors::table
        .filter(contributors::ebook_id.eq(ebook_id))
        .order(contributors::sort_order.asc())
        .select(CatalogContributor::as_select())
        .load(conn)?;

    for row in contributor_rows {
        let c = load_contributor(row);
        match c.role {
            ContributorRole::Author => parts.authors.push(c),
            ContributorRole::Illustrator => parts.illustrators.push(c),
            ContributorRole::Translator => parts.translators.push(c),
            ContributorRole::Contributor => parts.contributors.push(c),
        }
    }

    parts.tags = ebook_tags::table
        .inner_join(tags::table)
        .filter(ebook_tags::ebook_id.eq(ebook_id))
        .order(ebook_tags::sort_order.asc())
        .select(CatalogTag::as_select())
        .load(conn)?
        .into_iter()
        .map(|t| Tag { name: t.name, url_name: t.url_name })
        .collect();

    parts.loc_subjects = ebook_loc_subjects::table
        .inner_join(loc_subjects::table)
        .filter(ebook_loc_subjects::ebook_id.eq(ebook_id))
        .order(ebook_loc_subjects::sort_order.asc())
        .select(CatalogLocSubject::as_select())
        .load(conn)?
        .into_iter()
        .map(|s| LocSubject { name: s.name })
        .collect();

    parts.collections = collection_ebooks::table
        .inner_join(collections::table)
        .filter(collection_ebooks::ebook_id.eq(ebook_id))
        .order(collection_ebooks::sort_order.asc())
        .select((CatalogCollection::as_select(), CollectionEbook::as_select()))
        .load::<(CatalogCollection, CollectionEbook)>(conn)?
        .into_iter()
        .map(|(c, link)| CollectionMembership {
            collection: Collection { name: c.name, url_name: c.url_name },
            sequence_number: link.sequence_number,
            collection_type: link.collection_type.as_deref().map(CollectionType::from),
        })
        .collect();

    parts.sources = ebook_sources::table
        .filter(ebook_sources::ebook_id.eq(ebook_id))
        .order(ebook_sources::sort_order.asc())
        .select(CatalogSource::as_select())
        .load(conn)?
        .into_iter()
        .map(|s| EbookSource { source_type: SourceType::from_db_str(&s.source_type), url: s.url })
        .collect();

    parts.git_commits = git_commits::table
        .filter(git_commits::ebook_id.eq(ebook_id))
        .order(git_commits::sort_order.asc())
        .select(CatalogCommit::as_select())
        .load(conn)?
        .into_iter()
        .map(|c| CommitRecord { created: c.created.and_utc(), hash: c.hash, message: c.message })
        .collect();

    parts.toc_entries = toc_entries::table
        .filter(toc_entries::ebook_id.eq(ebook_id))
        .order(toc_entries::sort_order.asc())
        .select(toc_entries::toc_entry)
        .load::<String>(conn)?;

    Ok(parts)
}

/// Rebuild an `EbookRecord` from its row and child rows. Derived fields are
/// recomputed.
pub(crate) fn load_record(
    conn: &mut SqliteConnection,
    row: CatalogEbook,
    config: &CatalogConfig,
) -> Result<EbookRecord, DieselError> {
    let parts = load_record_parts(conn, row.id)?;
    let url = row.url.clone();

    let mut record = EbookRecord {
        identifier: row.identifier,
        www_filesystem_path: PathBuf::from(row.www_filesystem_path),
        repo_filesystem_path: PathBuf::from(row.repo_filesystem_path),
        title: row.title,
        full_title: row.full_title,
        alternate_title: row.alternate_title,
        description: row.description,
        long_description: row.long_description,
        language: row.language,
        word_count: row.word_count,
        reading_ease: row.reading_ease,
        ebook_created: row.ebook_created.map(|d| d.and_utc()),
        ebook_updated: row.ebook_updated.map(|d| d.and_utc()),
        github_url: row.github_url,
        wikipedia_url: row.wikipedia_url,
        text_single_page_byte_count: row.text_single_page_byte_count,
        downloads: DownloadUrls {
            kindle_cover_url: row.kindle_cover_url,
            epub_url: row.epub_url,
            advanced_epub_url: row.advanced_epub_url,
            kepub_url: row.kepub_url,
            azw3_url: row.azw3_url,
            dist_cover_url: row.dist_cover_url,
        },
        tags: parts.tags,
        loc_subjects: parts.loc_subjects,
        collections: parts.collections,
        authors: parts.authors,
        illustrators: parts.illustrators,
        translators: parts.translators,
        contributors: parts.contributors,
        sources: parts.sources,
        toc_entries: if row.has_toc { Some(parts.toc_entries) } else { None },
        git_commits: parts.git_commits,
        derived: DerivedFields::default(),
    };
    record.derived = compute_derived(&record, &url, config);

    Ok(record)
}

/// Load full records for the given ids, keeping the order of `ids`.
pub(crate) fn load_records_by_ids(
    conn: &mut SqliteConnection,
    ids: &[i32],
    config: &CatalogConfig,
) -> Result<Vec<EbookRecord>, DieselError> {
    let rows: Vec<CatalogEbook> = ebooks::table
        .filter(ebooks::id.eq_any(ids))
        .select(CatalogEbook::as_select())
        .load(conn)?;

    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(row) = rows.iter().find(|r| r.id == *id) {
            records.push(load_record(conn, row.clone(), config)?);
        }
    }
    Ok(records)
}

impl CatalogDbHandle {
    /// Insert a new title. Fails with `Duplicate` if the identifier is already present.
    pub fn create_ebook(&self, record: &EbookRecord, config: &CatalogConfig) -> Result<i32, CatalogError> {
        record.validate(config)?;

        let ebook_id = self.do_write(|db_conn| {
            db_conn.transaction::<_, CatalogError, _>(|conn| insert_ebook(conn, record))
        })?;

        info(&format!("Created ebook {}: {}", ebook_id, record.identifier));
        Ok(ebook_id)
    }

    /// Replace the stored title with the same identifier, including all its child rows.
    pub fn update_ebook(&self, record: &EbookRecord, config: &CatalogConfig) -> Result<i32, CatalogError> {
        record.validate(config)?;

        let ebook_id = self.do_write(|db_conn| {
            db_conn.transaction::<_, CatalogError, _>(|conn| {
                let ebook_id = find_ebook_id(conn, &record.identifier)?
                    .ok_or_else(|| CatalogError::NotFound(format!("Ebook not found: {}", record.identifier)))?;
                replace_ebook(conn, ebook_id, record)
            })
        })?;

        info(&format!("Updated ebook {}: {}", ebook_id, record.identifier));
        Ok(ebook_id)
    }

    pub fn create_or_update_ebook(&self, record: &EbookRecord, config: &CatalogConfig) -> Result<i32, CatalogError> {
        record.validate(config)?;

        self.do_write(|db_conn| {
            db_conn.transaction::<_, CatalogError, _>(|conn| {
                match find_ebook_id(conn, &record.identifier)? {
                    Some(ebook_id) => {
                        debug(&format!("create_or_update_ebook(): updating {}", record.identifier));
                        replace_ebook(conn, ebook_id, record)
                    }
                    None => {
                        debug(&format!("create_or_update_ebook(): creating {}", record.identifier));
                        insert_ebook(conn, record)
                    }
                }
            })
        })
    }

    pub fn get_ebook_by_identifier(&self, identifier: &str, config: &CatalogConfig) -> Result<EbookRecord, CatalogError> {
        self.do_read(|db_conn| {
            let row = ebooks::table
                .filter(ebooks::identifier.eq(identifier))
                .select(CatalogEbook::as_select())
                .first::<CatalogEbook>(db_conn)
                .optional()?
                .ok_or_else(|| CatalogError::NotFound(format!("Ebook not found: {}", identifier)))?;
            Ok(load_record(db_conn, row, config)?)
        })
    }

    /// Look up a title by its serving URL, e.g. `/ebooks/jules-verne/around-the-world-in-eighty-days`.
    pub fn get_ebook_by_url(&self, url: &str, config: &CatalogConfig) -> Result<EbookRecord, CatalogError> {
        let url = url.trim_end_matches('/');
        self.do_read(|db_conn| {
            let row = ebooks::table
                .filter(ebooks::url.eq(url))
                .select(CatalogEbook::as_select())
                .first::<CatalogEbook>(db_conn)
                .optional()?
                .ok_or_else(|| CatalogError::NotFound(format!("Ebook not found: {}", url)))?;
            Ok(load_record(db_conn, row, config)?)
        })
    }

    pub fn get_ebook_record_parts(&self, identifier: &str) -> Result<EbookRecordParts, CatalogError> {
        self.do_read(|db_conn| {
            let ebook_id = find_ebook_id(db_conn, identifier)?
                .ok_or_else(|| CatalogError::NotFound(format!("Ebook not found: {}", identifier)))?;
            Ok(load_record_parts(db_conn, ebook_id)?)
        })
    }

    /// Every title, newest first.
    pub fn get_ebooks(&self, config: &CatalogConfig) -> Result<Vec<EbookRecord>, CatalogError> {
        self.do_read(|db_conn| {
            let rows: Vec<CatalogEbook> = ebooks::table
                .order((ebooks::ebook_created.desc(), ebooks::id.asc()))
                .select(CatalogEbook::as_select())
                .load(db_conn)?;

            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                records.push(load_record(db_conn, row, config)?);
            }
            Ok(records)
        })
    }

    pub fn count_ebooks(&self) -> Result<i64, CatalogError> {
        self.do_read(|db_conn| Ok(ebooks::table.count().get_result::<i64>(db_conn)?))
    }

    /// Remove a title and its child rows. Shared tags, subjects and collections are kept.
    pub fn delete_ebook(&self, identifier: &str) -> Result<(), CatalogError> {
        self.do_write(|db_conn| {
            db_conn.transaction::<_, CatalogError, _>(|conn| {
                let ebook_id = find_ebook_id(conn, identifier)?
                    .ok_or_else(|| CatalogError::NotFound(format!("Ebook not found: {}", identifier)))?;
                delete_children(conn, ebook_id)?;
                diesel::delete(ebooks::table.find(ebook_id)).execute(conn)?;
                Ok(())
            })
        })?;

        info(&format!("Deleted ebook: {}", identifier));
        Ok(())
    }
}
