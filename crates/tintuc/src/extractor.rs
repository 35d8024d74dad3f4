// ABOUTME: The Extractor ties resolution, fetching, metadata and body selection into one record.
// ABOUTME: Batches run strictly in order; every URL starts from a freshly parsed document.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scraper::Html;

use crate::error::ExtractError;
use crate::metadata::{extract_language, extract_meta, extract_structured_fields};
use crate::options::{ExtractionPolicy, ExtractorBuilder, Options};
use crate::paragraphs::select_body;
use crate::record::{ArticleRecord, TYPE_ARTICLE, TYPE_UNKNOWN};
use crate::session::{Session, SessionConfig};
use crate::sites::{load_builtin_registry, SiteProfile, SiteRegistry};

/// Reject anything that is not an absolute http(s) URL.
fn validate_url(url: &str, op: &str) -> Result<(), ExtractError> {
    if url.is_empty() {
        return Err(ExtractError::invalid_url(url, op, None));
    }

    let parsed = url::Url::parse(url).map_err(|e| {
        ExtractError::invalid_url(url, op, Some(anyhow::anyhow!("malformed URL: {}", e)))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ExtractError::invalid_url(
            url,
            op,
            Some(anyhow::anyhow!("scheme must be http or https")),
        )),
    }
}

/// Builds the record for an already parsed page of `site`.
///
/// `registered` decides the record's content-type tag.
pub fn extract_document<R: Rng + ?Sized>(
    doc: &Html,
    site: &SiteProfile,
    registered: bool,
    policy: &ExtractionPolicy,
    rng: &mut R,
) -> Result<ArticleRecord, ExtractError> {
    let content_type = if registered { TYPE_ARTICLE } else { TYPE_UNKNOWN };
    let mut record = ArticleRecord::new(site.id.clone(), content_type);

    record.title = extract_meta(doc, &[("property", "og:title")]);
    record.url = extract_meta(doc, &[("property", "og:url")]);
    record.image = extract_meta(doc, &[("property", "og:image")]);
    record.description = extract_meta(doc, &[("property", "og:description")]);
    record.copyright = extract_meta(doc, &[("name", "copyright")]);
    record.language = Some(extract_language(doc));

    let structured = extract_structured_fields(doc);
    record.author = structured.author;
    record.date_published = structured.date_published;
    record.date_modified = structured.date_modified;

    record.body = Some(select_body(doc, site, policy, rng)?);
    Ok(record)
}

/// The main extractor: one fetch session, one site registry, one policy.
///
/// Extraction takes `&mut self`: the session's cookie jar and the window RNG
/// are used by one extraction at a time. Run one `Extractor` per worker for
/// concurrent extraction.
pub struct Extractor {
    opts: Options,
    session: Session,
    registry: SiteRegistry,
    rng: StdRng,
}

impl Extractor {
    /// Create a new ExtractorBuilder for configuring the extractor.
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    /// Create a new Extractor with the given options.
    pub fn new(mut opts: Options) -> Result<Self, ExtractError> {
        let registry = match opts.registry.take() {
            Some(registry) => registry,
            None => load_builtin_registry()?,
        };
        let session = Session::new(SessionConfig::from(&opts))?;
        let rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::debug!(sites = registry.len(), policy = %opts.policy, "extractor ready");
        Ok(Self {
            opts,
            session,
            registry,
            rng,
        })
    }

    /// The body selection policy, fixed for the extractor's lifetime.
    pub fn policy(&self) -> ExtractionPolicy {
        self.opts.policy
    }

    /// The site registry used for resolution.
    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// The fetch session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolve `url` to its site profile.
    pub fn resolve(&self, url: &str) -> Result<&SiteProfile, ExtractError> {
        self.registry.resolve(url)
    }

    /// Fetch `url` and extract its record.
    pub fn extract_one(&mut self, url: &str) -> Result<ArticleRecord, ExtractError> {
        validate_url(url, "Extract")?;
        let site = self.registry.resolve(url)?;
        let html = self.session.fetch(url, site)?;

        let doc = Html::parse_document(&html);
        let registered = self.registry.contains(&site.id);
        let record = extract_document(&doc, site, registered, &self.opts.policy, &mut self.rng)
            .map_err(|e| e.with_url(url))?;

        tracing::debug!(
            %url,
            site = %record.source,
            words = record.word_count(),
            "extracted record"
        );
        Ok(record)
    }

    /// Extract a record from HTML that was fetched elsewhere.
    ///
    /// `url` is only used to resolve the site.
    pub fn extract_html(&mut self, html: &str, url: &str) -> Result<ArticleRecord, ExtractError> {
        if html.is_empty() {
            return Err(ExtractError::no_content(
                url,
                "ExtractHtml",
                Some(anyhow::anyhow!("empty HTML")),
            ));
        }
        validate_url(url, "ExtractHtml")?;
        let site = self.registry.resolve(url)?;

        let doc = Html::parse_document(html);
        let registered = self.registry.contains(&site.id);
        extract_document(&doc, site, registered, &self.opts.policy, &mut self.rng)
            .map_err(|e| e.with_url(url))
    }

    /// Extract each URL in order, handing every outcome to `on_outcome` before the next URL starts.
    ///
    /// A failing URL does not stop the batch.
    pub fn extract_each<I, S, F>(&mut self, urls: I, mut on_outcome: F)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&str, Result<ArticleRecord, ExtractError>),
    {
        for url in urls {
            let url = url.as_ref();
            let outcome = self.extract_one(url);
            if let Err(ref e) = outcome {
                tracing::warn!(%url, code = %e.code, error = %e, "extraction failed");
            }
            on_outcome(url, outcome);
        }
    }

    /// Extract every URL in order, returning one outcome per URL.
    pub fn extract_many<I, S>(&mut self, urls: I) -> Vec<Result<ArticleRecord, ExtractError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcomes = Vec::new();
        self.extract_each(urls, |_, outcome| outcomes.push(outcome));
        outcomes
    }
}
