//! Catalog queries: filtered and paged listings, author and collection
//! pages, tag and collection indexes.

use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Integer, Text};
use diesel::sqlite::Sqlite;
use serde::Serialize;

use crate::config::CatalogConfig;
use crate::db::catalog::load_records_by_ids;
use crate::db::catalog_models::{CatalogCollection, CatalogTag};
use crate::db::catalog_schema::{collections, tags};
use crate::db::CatalogDbHandle;
use crate::ebook::model::{Collection, EbookRecord, Tag};
use crate::error::CatalogError;
use crate::helpers::{normalize_indexable_text, sorted_name};
use crate::logger::debug;
use crate::types::EbookSortType;

#[derive(QueryableByName)]
struct CountResult {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

#[derive(QueryableByName)]
struct EbookId {
    #[diesel(sql_type = Integer)]
    id: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LibraryParams {
    /// Phrase to match against the indexable text.
    pub query: Option<String>,
    /// Tag URL names. Empty, or containing `all`, means no tag filter.
    pub tags: Vec<String>,
    pub sort: EbookSortType,
    /// 1-based.
    pub page: i64,
    /// Falls back to the configured page size when not positive.
    pub per_page: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryPage {
    pub ebooks: Vec<EbookRecord>,
    /// Matching titles across all pages.
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub page_count: i64,
}

/// The phrase query as a LIKE pattern over `' ' || indexable_text || ' '`,
/// so matches fall on word boundaries. `None` if nothing searchable remains.
pub fn phrase_pattern(query: &str) -> Option<String> {
    let q = normalize_indexable_text(query);
    if q.is_empty() {
        None
    } else {
        Some(format!("% {} %", q))
    }
}

fn order_by(sort: EbookSortType) -> &'static str {
    match sort {
        EbookSortType::Newest => "e.ebook_created DESC, e.id ASC",
        EbookSortType::AuthorAlpha => "MIN(con.sort_name) ASC, e.ebook_created DESC, e.id ASC",
        EbookSortType::ReadingEase => "e.reading_ease DESC, e.id ASC",
        EbookSortType::Length => "e.word_count ASC, e.id ASC",
    }
}

/// The shared `FROM ... WHERE ...` part of the filter queries, and its binds in order.
fn filter_clause(params: &LibraryParams) -> (String, Vec<String>) {
    let mut joins = String::new();
    let mut conditions = vec!["1 = 1".to_string()];
    let mut binds: Vec<String> = Vec::new();

    if params.sort == EbookSortType::AuthorAlpha {
        joins.push_str(" INNER JOIN contributors con ON con.ebook_id = e.id");
        conditions.push("con.marc_role = 'aut'".to_string());
    }

    let tags: Vec<&String> = params.tags.iter().filter(|t| !t.trim().is_empty()).collect();
    if !tags.is_empty() && !tags.iter().any(|t| t.as_str() == "all") {
        joins.push_str(" INNER JOIN ebook_tags et ON et.ebook_id = e.id");
        joins.push_str(" INNER JOIN tags t ON t.id = et.tag_id");
        let placeholders = vec!["?"; tags.len()].join(", ");
        conditions.push(format!("t.url_name IN ({})", placeholders));
        binds.extend(tags.into_iter().cloned());
    }

    if let Some(pattern) = params.query.as_deref().and_then(phrase_pattern) {
        conditions.push("(' ' || e.indexable_text || ' ') LIKE ?".to_string());
        binds.push(pattern);
    }

    (format!("FROM ebooks e{} WHERE {}", joins, conditions.join(" AND ")), binds)
}

pub struct Library<'a> {
    pub db: &'a CatalogDbHandle,
    pub config: &'a CatalogConfig,
}

impl<'a> Library<'a> {
    pub fn new(db: &'a CatalogDbHandle, config: &'a CatalogConfig) -> Self {
        Library { db, config }
    }

    pub fn filter_ebooks(&self, params: &LibraryParams) -> Result<LibraryPage, CatalogError> {
        let per_page = if params.per_page > 0 { params.per_page } else { self.config.page_size.max(1) };
        let page = params.page.max(1);
        let offset = (page - 1) * per_page;

        let (from_where, binds) = filter_clause(params);
        debug(&format!("filter_ebooks(): {} {:?}", from_where, binds));

        let count_sql = format!("SELECT COUNT(DISTINCT e.id) AS count {}", from_where);
        let ids_sql = format!(
            "SELECT e.id AS id {} GROUP BY e.id ORDER BY {} LIMIT ? OFFSET ?",
            from_where,
            order_by(params.sort)
        );

        self.db.do_read(|db_conn| {
            let mut count_query = sql_query(count_sql).into_boxed::<Sqlite>();
            for b in &binds {
                count_query = count_query.bind::<Text, _>(b.clone());
            }
            let total = count_query.get_result::<CountResult>(db_conn)?.count;

            let mut ids_query = sql_query(ids_sql).into_boxed::<Sqlite>();
            for b in &binds {
                ids_query = ids_query.bind::<Text, _>(b.clone());
            }
            let ids: Vec<i32> = ids_query
                .bind::<BigInt, _>(per_page)
                .bind::<BigInt, _>(offset)
                .load::<EbookId>(db_conn)?
                .into_iter()
                .map(|r| r.id)
                .collect();

            let ebooks = load_records_by_ids(db_conn, &ids, self.config)?;

            Ok(LibraryPage {
                ebooks,
                total,
                page,
                per_page,
                page_count: (total + per_page - 1) / per_page,
            })
        })
    }

    /// Titles by the author with URL name `url_path`. A path like
    /// `karl-marx_friedrich-engels` matches only titles credited to all of
    /// the named authors.
    pub fn get_ebooks_by_author(&self, url_path: &str) -> Result<Vec<EbookRecord>, CatalogError> {
        let authors: Vec<String> = url_path.split('_')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; authors.len()].join(", ");
        let sql = format!(
            r#"
            SELECT e.id AS id
            FROM ebooks e
            INNER JOIN contributors con ON con.ebook_id = e.id
            WHERE con.marc_role = 'aut'
                AND con.url_name IN ({})
            GROUP BY e.id
            HAVING COUNT(DISTINCT con.url_name) = ?
            ORDER BY e.ebook_created DESC, e.id ASC
            "#,
            placeholders
        );

        let author_count = authors.len() as i64;

        self.db.do_read(|db_conn| {
            let mut query = sql_query(sql).into_boxed::<Sqlite>();
            for a in authors {
                query = query.bind::<Text, _>(a);
            }
            let ids: Vec<i32> = query
                .bind::<BigInt, _>(author_count)
                .load::<EbookId>(db_conn)?
                .into_iter()
                .map(|r| r.id)
                .collect();

            Ok(load_records_by_ids(db_conn, &ids, self.config)?)
        })
    }

    /// Titles in a collection, in sequence order, then newest first.
    pub fn get_ebooks_by_collection(&self, url_name: &str) -> Result<Vec<EbookRecord>, CatalogError> {
        self.db.do_read(|db_conn| {
            let ids: Vec<i32> = sql_query(
                r#"
                SELECT e.id AS id
                FROM ebooks e
                INNER JOIN collection_ebooks ce ON ce.ebook_id = e.id
                INNER JOIN collections c ON c.id = ce.collection_id
                WHERE c.url_name = ?
                ORDER BY ce.sequence_number, e.ebook_created DESC, e.id ASC
                "#
            )
            .bind::<Text, _>(url_name)
            .load::<EbookId>(db_conn)?
            .into_iter()
            .map(|r| r.id)
            .collect();

            Ok(load_records_by_ids(db_conn, &ids, self.config)?)
        })
    }

    /// Up to `count` random other titles, from `tag_url_name` if given.
    pub fn get_related_ebooks(
        &self,
        identifier: &str,
        count: i64,
        tag_url_name: Option<&str>,
    ) -> Result<Vec<EbookRecord>, CatalogError> {
        self.db.do_read(|db_conn| {
            let rows: Vec<EbookId> = match tag_url_name {
                Some(tag) => sql_query(
                    r#"
                    SELECT e.id AS id
                    FROM ebooks e
                    INNER JOIN ebook_tags et ON et.ebook_id = e.id
                    INNER JOIN tags t ON t.id = et.tag_id
                    WHERE t.url_name = ?
                        AND e.identifier != ?
                    ORDER BY RANDOM()
                    LIMIT ?
                    "#
                )
                .bind::<Text, _>(tag)
                .bind::<Text, _>(identifier)
                .bind::<BigInt, _>(count)
                .load(db_conn)?,

                None => sql_query(
                    r#"
                    SELECT e.id AS id
                    FROM ebooks e
                    WHERE e.identifier != ?
                    ORDER BY RANDOM()
                    LIMIT ?
                    "#
                )
                .bind::<Text, _>(identifier)
                .bind::<BigInt, _>(count)
                .load(db_conn)?,
            };

            let ids: Vec<i32> = rows.into_iter().map(|r| r.id).collect();
            Ok(load_records_by_ids(db_conn, &ids, self.config)?)
        })
    }

    pub fn get_tags(&self) -> Result<Vec<Tag>, CatalogError> {
        self.db.do_read(|db_conn| {
            let rows: Vec<CatalogTag> = tags::table
                .order(tags::name.asc())
                .select(CatalogTag::as_select())
                .load(db_conn)?;

            Ok(rows.into_iter().map(|t| Tag { name: t.name, url_name: t.url_name }).collect())
        })
    }

    /// Every collection, ordered by name ignoring leading articles and diacritics.
    pub fn get_collections(&self) -> Result<Vec<Collection>, CatalogError> {
        let rows: Vec<CatalogCollection> = self.db.do_read(|db_conn| {
            Ok(collections::table
                .select(CatalogCollection::as_select())
                .load(db_conn)?)
        })?;

        let mut result: Vec<Collection> = rows.into_iter()
            .map(|c| Collection { name: c.name, url_name: c.url_name })
            .collect();
        result.sort_by_cached_key(|c| sorted_name(&c.name));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_pattern() {
        assert_eq!(phrase_pattern("  Around the  World! "), Some("% Around the World %".to_string()));
        assert_eq!(phrase_pattern("Les Misérables"), Some("% Les Miserables %".to_string()));
        assert_eq!(phrase_pattern("%_?"), None);
        assert_eq!(phrase_pattern(""), None);
    }

    #[test]
    fn test_filter_clause_tags() {
        let params = LibraryParams {
            tags: vec!["fiction".to_string(), "adventure".to_string()],
            ..Default::default()
        };
        let (sql, binds) = filter_clause(&params);
        assert!(sql.contains("t.url_name IN (?, ?)"));
        assert_eq!(binds, vec!["fiction".to_string(), "adventure".to_string()]);

        let params = LibraryParams {
            tags: vec!["fiction".to_string(), "all".to_string()],
            ..Default::default()
        };
        let (sql, binds) = filter_clause(&params);
        assert!(!sql.contains("tags"));
        assert!(binds.is_empty());
    }

    #[test]
    fn test_filter_clause_author_sort_joins_contributors() {
        let params = LibraryParams {
            sort: EbookSortType::AuthorAlpha,
            query: Some("verne".to_string()),
            ..Default::default()
        };
        let (sql, binds) = filter_clause(&params);
        assert!(sql.contains("INNER JOIN contributors con"));
        assert!(sql.contains("con.marc_role = 'aut'"));
        assert_eq!(binds, vec!["% verne %".to_string()]);
    }
}
