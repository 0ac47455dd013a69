//! Ranking bulletin links on a listing page.

use std::collections::BTreeSet;

use fuel_watch_extract::fold::fold;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

/// What part of a link a [`ScoringRule`] inspects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTarget {
    /// The visible anchor text.
    #[default]
    Anchor,
    /// The resolved link URL.
    Href,
}

/// Adds `weight` once when any of `words` occurs in the link's target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoringRule {
    pub words: Vec<String>,
    pub weight: i32,
    #[serde(default)]
    pub target: MatchTarget,
}

impl ScoringRule {
    #[must_use]
    pub fn new(words: &[&str], weight: i32, target: MatchTarget) -> Self {
        Self {
            words: words.iter().map(|w| (*w).to_owned()).collect(),
            weight,
            target,
        }
    }

    fn score(&self, anchor: &str, href: &str) -> i32 {
        let haystack = match self.target {
            MatchTarget::Anchor => anchor,
            MatchTarget::Href => href,
        };
        if self.words.iter().any(|w| haystack.contains(&fold(w))) {
            self.weight
        } else {
            0
        }
    }
}

/// How listing-page links are filtered and scored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkRanking {
    pub rules: Vec<ScoringRule>,
    /// Accepted endings of the link path (case-insensitive). Empty accepts
    /// every link.
    pub suffixes: Vec<String>,
    /// Added when the link URL mentions the current year.
    pub current_year_bonus: i32,
}

impl Default for LinkRanking {
    fn default() -> Self {
        Self {
            rules: vec![
                ScoringRule::new(&["aviso", "combustible", "precio"], 5, MatchTarget::Anchor),
                ScoringRule::new(&["semana"], 1, MatchTarget::Anchor),
            ],
            suffixes: vec![".pdf".to_owned()],
            current_year_bonus: 2,
        }
    }
}

/// A candidate bulletin link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub url: String,
    /// Anchor text with whitespace collapsed.
    pub anchor_text: String,
    pub score: i32,
}

impl LinkRanking {
    fn accepts(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if self.suffixes.is_empty() {
            return true;
        }
        let path = url.path().to_ascii_lowercase();
        self.suffixes
            .iter()
            .any(|s| path.ends_with(&s.to_ascii_lowercase()))
    }

    fn score(&self, anchor: &str, url: &str, year: i32) -> i32 {
        let folded_anchor = fold(anchor);
        let folded_url = fold(url);
        let rules: i32 = self
            .rules
            .iter()
            .map(|rule| rule.score(&folded_anchor, &folded_url))
            .sum();
        let bonus = if url.contains(&year.to_string()) {
            self.current_year_bonus
        } else {
            0
        };
        rules + bonus
    }
}

/// Returns every acceptable link on `html`, best first.
///
/// Relative links are resolved against `base`. Repeated URLs keep their
/// first occurrence, and links with equal scores keep document order.
#[must_use]
pub fn rank_links(html: &str, base: &Url, ranking: &LinkRanking, year: i32) -> Vec<LinkCandidate> {
    let document = Html::parse_document(html);
    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    let mut candidates: Vec<LinkCandidate> = document
        .select(&anchor_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            let url = base.join(href).ok()?;
            if !ranking.accepts(&url) {
                return None;
            }
            let url = url.to_string();
            if !seen.insert(url.clone()) {
                return None;
            }

            let anchor_text = a.text().collect::<Vec<_>>().join(" ");
            let anchor_text = anchor_text.split_whitespace().collect::<Vec<_>>().join(" ");
            let score = ranking.score(&anchor_text, &url, year);

            Some(LinkCandidate {
                url,
                anchor_text,
                score,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <a href="/wp-content/uploads/2024/12/resolucion.pdf">Resolución anual</a>
          <a href="https://micm.gob.do/contacto">Contacto</a>
          <a href="../docs/Aviso-semana-49.PDF">
             Aviso de precios de  combustibles, semana 49
          </a>
          <a href="/wp-content/uploads/2025/09/aviso-37.pdf">Aviso semana 37</a>
          <a href="/wp-content/uploads/2025/09/aviso-37.pdf">duplicate</a>
          <a href="mailto:info@micm.gob.do">precio.pdf</a>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://micm.gob.do/direcciones/combustibles/avisos/").unwrap()
    }

    #[test]
    fn ranks_keyword_links_first() {
        let candidates = rank_links(LISTING, &base(), &LinkRanking::default(), 2025);

        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[0].url,
            "https://micm.gob.do/wp-content/uploads/2025/09/aviso-37.pdf"
        );
        assert_eq!(candidates[0].score, 8);
        assert_eq!(
            candidates[1].url,
            "https://micm.gob.do/direcciones/combustibles/docs/Aviso-semana-49.PDF"
        );
        assert_eq!(
            candidates[1].anchor_text,
            "Aviso de precios de combustibles, semana 49"
        );
        assert_eq!(candidates[1].score, 6);
        assert_eq!(candidates[2].score, 0);
    }

    #[test]
    fn ties_keep_document_order() {
        let html = r#"<a href="a.pdf">x</a><a href="b.pdf">y</a><a href="c.pdf">z</a>"#;
        let urls: Vec<_> = rank_links(html, &base(), &LinkRanking::default(), 2025)
            .into_iter()
            .map(|c| c.url)
            .collect();
        assert!(urls[0].ends_with("/a.pdf"));
        assert!(urls[1].ends_with("/b.pdf"));
        assert!(urls[2].ends_with("/c.pdf"));
    }

    #[test]
    fn href_rules_and_empty_suffixes() {
        let ranking = LinkRanking {
            rules: vec![ScoringRule::new(&["precios"], 3, MatchTarget::Href)],
            suffixes: Vec::new(),
            current_year_bonus: 0,
        };
        let html = r#"<a href="/otros/">Otros</a><a href="/avisos-de-precios/">Avisos</a>"#;
        let candidates = rank_links(html, &base(), &ranking, 2025);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].url.ends_with("/avisos-de-precios/"));
        assert_eq!(candidates[0].score, 3);
    }

    #[test]
    fn empty_page_has_no_candidates() {
        assert!(rank_links("<p>nada</p>", &base(), &LinkRanking::default(), 2025).is_empty());
    }
}
