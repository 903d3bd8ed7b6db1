use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::catalog_schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = ebooks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogEbook {
    pub id: i32,
    pub identifier: String,
    pub www_filesystem_path: String,
    pub repo_filesystem_path: String,
    pub url: String,
    pub title: String,
    pub full_title: Option<String>,
    pub alternate_title: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub language: Option<String>,
    pub word_count: i64,
    pub reading_ease: f64,
    pub github_url: Option<String>,
    pub wikipedia_url: Option<String>,
    pub kindle_cover_url: Option<String>,
    pub epub_url: Option<String>,
    pub advanced_epub_url: Option<String>,
    pub kepub_url: Option<String>,
    pub azw3_url: Option<String>,
    pub dist_cover_url: Option<String>,
    pub text_single_page_byte_count: Option<i64>,
    pub indexable_text: String,
    pub has_toc: bool,
    pub ebook_created: Option<NaiveDateTime>,
    pub ebook_updated: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Used for both insert and update. `None` clears the column on update.
#[derive(Insertable, AsChangeset)]
#[diesel(table_name = ebooks)]
#[diesel(treat_none_as_null = true)]
pub struct NewCatalogEbook<'a> {
    pub identifier: &'a str,
    pub www_filesystem_path: &'a str,
    pub repo_filesystem_path: &'a str,
    pub url: &'a str,
    pub title: &'a str,
    pub full_title: Option<&'a str>,
    pub alternate_title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub long_description: Option<&'a str>,
    pub language: Option<&'a str>,
    pub word_count: i64,
    pub reading_ease: f64,
    pub github_url: Option<&'a str>,
    pub wikipedia_url: Option<&'a str>,
    pub kindle_cover_url: Option<&'a str>,
    pub epub_url: Option<&'a str>,
    pub advanced_epub_url: Option<&'a str>,
    pub kepub_url: Option<&'a str>,
    pub azw3_url: Option<&'a str>,
    pub dist_cover_url: Option<&'a str>,
    pub text_single_page_byte_count: Option<i64>,
    pub indexable_text: &'a str,
    pub has_toc: bool,
    pub ebook_created: Option<NaiveDateTime>,
    pub ebook_updated: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(CatalogEbook, foreign_key = ebook_id))]
#[diesel(table_name = contributors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogContributor {
    pub id: i32,
    pub ebook_id: i32,
    pub name: String,
    pub url_name: String,
    pub sort_name: Option<String>,
    pub full_name: Option<String>,
    pub wikipedia_url: Option<String>,
    pub nacoaf_url: Option<String>,
    pub marc_role: String,
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = contributors)]
pub struct NewCatalogContributor<'a> {
    pub ebook_id: i32,
    pub name: &'a str,
    pub url_name: &'a str,
    pub sort_name: Option<&'a str>,
    pub full_name: Option<&'a str>,
    pub wikipedia_url: Option<&'a str>,
    pub nacoaf_url: Option<&'a str>,
    pub marc_role: &'a str,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogTag {
    pub id: i32,
    pub name: String,
    pub url_name: String,
}

#[derive(Insertable)]
#[diesel(table_name = tags)]
pub struct NewCatalogTag<'a> {
    pub name: &'a str,
    pub url_name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = ebook_tags)]
pub struct NewEbookTag {
    pub ebook_id: i32,
    pub tag_id: i32,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = loc_subjects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogLocSubject {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = loc_subjects)]
pub struct NewCatalogLocSubject<'a> {
    pub name: &'a str,
}

#[derive(Insertable)]
#[diesel(table_name = ebook_loc_subjects)]
pub struct NewEbookLocSubject {
    pub ebook_id: i32,
    pub loc_subject_id: i32,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = collections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogCollection {
    pub id: i32,
    pub name: String,
    pub url_name: String,
}

#[derive(Insertable)]
#[diesel(table_name = collections)]
pub struct NewCatalogCollection<'a> {
    pub name: &'a str,
    pub url_name: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, PartialEq)]
#[diesel(table_name = collection_ebooks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CollectionEbook {
    pub ebook_id: i32,
    pub collection_id: i32,
    pub sequence_number: Option<i32>,
    pub collection_type: Option<String>,
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = collection_ebooks)]
pub struct NewCollectionEbook<'a> {
    pub ebook_id: i32,
    pub collection_id: i32,
    pub sequence_number: Option<i32>,
    pub collection_type: Option<&'a str>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(CatalogEbook, foreign_key = ebook_id))]
#[diesel(table_name = git_commits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogCommit {
    pub id: i32,
    pub ebook_id: i32,
    pub created: NaiveDateTime,
    pub hash: String,
    pub message: String,
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = git_commits)]
pub struct NewCatalogCommit<'a> {
    pub ebook_id: i32,
    pub created: NaiveDateTime,
    pub hash: &'a str,
    pub message: &'a str,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(CatalogEbook, foreign_key = ebook_id))]
#[diesel(table_name = ebook_sources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogSource {
    pub id: i32,
    pub ebook_id: i32,
    pub source_type: String,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = ebook_sources)]
pub struct NewCatalogSource<'a> {
    pub ebook_id: i32,
    pub source_type: &'a str,
    pub url: &'a str,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(belongs_to(CatalogEbook, foreign_key = ebook_id))]
#[diesel(table_name = toc_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CatalogTocEntry {
    pub id: i32,
    pub ebook_id: i32,
    pub toc_entry: String,
    pub sort_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = toc_entries)]
pub struct NewCatalogTocEntry<'a> {
    pub ebook_id: i32,
    pub toc_entry: &'a str,
    pub sort_order: i32,
}
