use crate::ebook::metadata::{PackageMetadata, XmlElement};
use crate::ebook::model::Contributor;
use crate::error::CatalogError;
use crate::helpers::make_url_safe;
use crate::logger::{debug, warn};
use crate::types::ContributorRole;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedContributors {
    pub authors: Vec<Contributor>,
    pub illustrators: Vec<Contributor>,
    pub translators: Vec<Contributor>,
    pub contributors: Vec<Contributor>,
}

fn build_contributor(meta: &PackageMetadata, el: &XmlElement, name: &str, role: ContributorRole) -> Contributor {
    let id = el.id();
    let sort_name = match role {
        ContributorRole::Author => Some(meta.refinement(id, "file-as").unwrap_or_else(|| name.to_string())),
        _ => meta.refinement(id, "file-as"),
    };

    Contributor {
        name: name.to_string(),
        url_name: make_url_safe(name),
        sort_name,
        full_name: meta.refinement(id, "se:name.person.full-name"),
        wikipedia_url: meta.refinement(id, "se:url.encyclopedia.wikipedia"),
        nacoaf_url: meta.refinement(id, "se:url.authority.nacoaf"),
        role,
    }
}

pub fn resolve_authors(meta: &PackageMetadata) -> Result<Vec<Contributor>, CatalogError> {
    let mut authors = Vec::new();

    // Blank names are kept here and rejected by validation.
    for el in meta.elements("dc:creator") {
        let name = el.text.trim();
        if name.is_empty() {
            warn(&format!("<dc:creator id=\"{}\"> has no name", el.id()));
        }
        authors.push(build_contributor(meta, el, name, ContributorRole::Author));
    }

    if authors.is_empty() {
        return Err(CatalogError::Parsing("Invalid <dc:creator> element.".to_string()));
    }

    Ok(authors)
}

/// Resolve all credits, applying the suppression and de-duplication rules:
///
/// - A contributor refined with `display-seq` of "0" lands in no bucket.
/// - Roles other than trl, ill and ctb on a `dc:contributor` are not bucketed.
/// - An illustrator whose name matches a translator is dropped.
pub fn resolve_contributors(meta: &PackageMetadata) -> Result<ResolvedContributors, CatalogError> {
    let mut res = ResolvedContributors {
        authors: resolve_authors(meta)?,
        ..Default::default()
    };

    for el in meta.elements("dc:contributor") {
        let name = el.text.trim();
        let id = el.id();
        let suppressed = meta.refinement(id, "display-seq").as_deref() == Some("0");

        for role_code in meta.refinement_values(id, &["role", "se:role"]) {
            let role = match ContributorRole::from_marc_code(&role_code) {
                Some(ContributorRole::Author) | None => {
                    debug(&format!("Contributor {} has unbucketed role: {}", name, role_code));
                    continue;
                }
                Some(role) => role,
            };

            if suppressed {
                continue;
            }

            let c = build_contributor(meta, el, name, role);
            match role {
                ContributorRole::Translator => res.translators.push(c),
                ContributorRole::Illustrator => res.illustrators.push(c),
                ContributorRole::Contributor => res.contributors.push(c),
                ContributorRole::Author => {}
            }
        }
    }

    let translators = &res.translators;
    res.illustrators.retain(|ill| !translators.iter().any(|t| t.name == ill.name));

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opf(metadata: &str) -> PackageMetadata {
        let xml = format!(r#"<package><metadata>{}</metadata></package>"#, metadata);
        PackageMetadata::parse(&xml).unwrap()
    }

    #[test]
    fn test_author_sort_name_falls_back_to_name() {
        let m = opf(r##"
            <dc:creator id="author-1">Karl Marx</dc:creator>
            <meta property="file-as" refines="#author-1">Marx, Karl</meta>
            <meta property="se:url.authority.nacoaf" refines="#author-1">http://id.loc.gov/authorities/names/n79006404</meta>
            <dc:creator id="author-2">Friedrich Engels</dc:creator>
            <dc:creator>Anonymous</dc:creator>
        "##);
        let authors = resolve_authors(&m).unwrap();
        assert_eq!(authors.len(), 3);
        assert_eq!(authors[0].sort_name.as_deref(), Some("Marx, Karl"));
        assert_eq!(authors[0].url_name, "karl-marx");
        assert!(authors[0].nacoaf_url.is_some());
        assert_eq!(authors[1].sort_name.as_deref(), Some("Friedrich Engels"));
        assert_eq!(authors[2].sort_name.as_deref(), Some("Anonymous"));
        assert!(authors.iter().all(|a| a.role == ContributorRole::Author));
    }

    #[test]
    fn test_no_authors_is_parsing_error() {
        let m = opf(r#"<dc:contributor id="c">Someone</dc:contributor>"#);
        assert!(matches!(resolve_authors(&m), Err(CatalogError::Parsing(_))));
        assert!(matches!(resolve_contributors(&m), Err(CatalogError::Parsing(_))));
    }

    #[test]
    fn test_blank_author_is_kept() {
        let m = opf(r#"<dc:creator id="author">  </dc:creator>"#);
        let authors = resolve_authors(&m).unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].name, "");
        assert_eq!(authors[0].url_name, "");
    }

    #[test]
    fn test_role_buckets_in_document_order() {
        let m = opf(r##"
            <dc:creator id="author">Leo Tolstoy</dc:creator>
            <dc:contributor id="trl-1">Louise Maude</dc:contributor>
            <meta property="role" refines="#trl-1">trl</meta>
            <dc:contributor id="trl-2">Aylmer Maude</dc:contributor>
            <meta property="role" refines="#trl-2">trl</meta>
            <meta property="se:role" refines="#trl-2">ctb</meta>
            <dc:contributor id="ill">Ilya Repin</dc:contributor>
            <meta property="role" refines="#ill">ill</meta>
            <dc:contributor id="prod">Alex Cabal</dc:contributor>
            <meta property="role" refines="#prod">bkp</meta>
        "##);
        let res = resolve_contributors(&m).unwrap();
        let names = |v: &Vec<Contributor>| v.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&res.translators), vec!["Louise Maude", "Aylmer Maude"]);
        assert_eq!(names(&res.contributors), vec!["Aylmer Maude"]);
        assert_eq!(names(&res.illustrators), vec!["Ilya Repin"]);
        assert_eq!(res.translators[0].sort_name, None);
    }

    #[test]
    fn test_display_suppression() {
        let m = opf(r##"
            <dc:creator id="author">Homer</dc:creator>
            <dc:contributor id="c1">Hidden Person</dc:contributor>
            <meta property="role" refines="#c1">trl</meta>
            <meta property="role" refines="#c1">ill</meta>
            <meta property="display-seq" refines="#c1">0</meta>
            <dc:contributor id="c2">Shown Person</dc:contributor>
            <meta property="role" refines="#c2">ctb</meta>
            <meta property="display-seq" refines="#c2">1</meta>
        "##);
        let res = resolve_contributors(&m).unwrap();
        assert!(res.translators.is_empty());
        assert!(res.illustrators.is_empty());
        assert_eq!(res.contributors.len(), 1);
        assert_eq!(res.contributors[0].name, "Shown Person");
    }

    #[test]
    fn test_translator_wins_over_illustrator() {
        let m = opf(r##"
            <dc:creator id="author">Hans Christian Andersen</dc:creator>
            <dc:contributor id="c1">Jean Hersholt</dc:contributor>
            <meta property="role" refines="#c1">ill</meta>
            <dc:contributor id="c2">Jean Hersholt</dc:contributor>
            <meta property="role" refines="#c2">trl</meta>
            <dc:contributor id="c3">Vilhelm Pedersen</dc:contributor>
            <meta property="role" refines="#c3">ill</meta>
        "##);
        let res = resolve_contributors(&m).unwrap();
        assert_eq!(res.translators.len(), 1);
        assert_eq!(res.translators[0].name, "Jean Hersholt");
        assert_eq!(res.illustrators.len(), 1);
        assert_eq!(res.illustrators[0].name, "Vilhelm Pedersen");
    }
}
