//! Request path classification.
//!
//! Responsibility:
//! - Decide, per request path, whether authentication is skipped entirely
//!   (anonymous), whether the credential is forwarded without validation
//!   (validation-exempt), or whether full validation is required (protected).
//!
//! Pattern syntax (Ant-style):
//! - `**` matches zero or more whole segments
//! - `*` matches any run of characters inside one segment
//! - `?` matches exactly one character inside one segment
//!
//! Segments are compared strictly: a trailing or doubled `/` is an empty
//! segment of its own, so `/favicon.ico/` does not match `/favicon.ico`.
//!
//! Patterns are compiled once at startup and never mutated afterwards, so a
//! single `PathClassifier` can be shared across all in-flight requests.

use std::fmt;

use thiserror::Error;

/// Endpoints reachable without any credential.
pub const DEFAULT_ANONYMOUS_PATHS: &[&str] = &[
    // read-only public
    "/favicon.ico",
    // sign-in flows and public landing data
    "/api/auth/login/**",
    "/api/auth/signup/**",
    "/api/blogs/landings/latest",
    "/api/blogs/landings/popular",
    "/api/users/checkBlogName",
    "/api/kis/stocks/**",
    "/api/news-summary/todaynews",
    // API documentation
    "/api/v3/api-docs/**",
    "/api/swagger-ui/**",
    "/api/swagger-ui.html",
    "/api/webjars/**",
    "/swagger-resources/**",
    "/api/blog-service/v3/api-docs",
    "/api/user-service/v3/api-docs",
    "/api/news-service/openapi.json",
    "/api/stock-service/v3/api-docs",
    "/api/investment-service/v3/api-docs",
    "/api/stock-integration-service/v3/api-docs",
    "/api/stock-integration-service/openapi.json",
    "/api/image-service/openapi.json",
    "/api/stock-test-service/openapi.json",
];

/// Endpoints that need a passport but accept a credential that would fail
/// validation (token reissue accepts already-expired access tokens).
pub const DEFAULT_VALIDATION_EXEMPT_PATHS: &[&str] = &["/api/auth/reissue"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCategory {
    Anonymous,
    ValidationExempt,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty path pattern")]
    Empty,
    #[error("path pattern must start with '/': {0}")]
    NotAbsolute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard(Vec<char>),
    AnyDepth,
}

/// A compiled path pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.raw).finish()
    }
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }
        if !trimmed.starts_with('/') {
            return Err(PatternError::NotAbsolute(trimmed.to_string()));
        }

        let segments = split_segments(trimmed)
            .map(|seg| match seg {
                "**" => Segment::AnyDepth,
                s if s.contains(['*', '?']) => Segment::Wildcard(s.chars().collect()),
                s => Segment::Literal(s.to_string()),
            })
            .collect();

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_segments(path).collect();
        match_segments(&self.segments, &path)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Whether `path` can be classified as-is.
///
/// Dot segments (`.`, `..`, also percent-encoded) and backslashes are
/// resolved by the URL parser when the request is forwarded, so the
/// backend would see a different path than the one classified here.
pub fn is_canonical(path: &str) -> bool {
    !path.contains('\\') && !split_segments(path).any(is_dot_segment)
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment_matches(segment, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn segment_matches(segment: &Segment, text: &str) -> bool {
    match segment {
        Segment::Literal(lit) => lit == text,
        Segment::Wildcard(pattern) => {
            let text: Vec<char> = text.chars().collect();
            wildcard_matches(pattern, &text)
        }
        Segment::AnyDepth => true,
    }
}

// Greedy wildcard match with single-star backtracking.
fn wildcard_matches(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(c) if *c == '?' || *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Maps a request path to exactly one `PathCategory`.
///
/// Categories are checked in priority order (anonymous, then
/// validation-exempt); anything unmatched is protected.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    anonymous: Vec<PathPattern>,
    validation_exempt: Vec<PathPattern>,
}

impl PathClassifier {
    pub fn new<A, E>(anonymous: A, validation_exempt: E) -> Result<Self, PatternError>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            anonymous: compile(anonymous)?,
            validation_exempt: compile(validation_exempt)?,
        })
    }

    pub fn classify(&self, path: &str) -> PathCategory {
        if self.anonymous.iter().any(|p| p.matches(path)) {
            PathCategory::Anonymous
        } else if self.validation_exempt.iter().any(|p| p.matches(path)) {
            PathCategory::ValidationExempt
        } else {
            PathCategory::Protected
        }
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self {
            anonymous: DEFAULT_ANONYMOUS_PATHS
                .iter()
                .filter_map(|p| PathPattern::parse(p).ok())
                .collect(),
            validation_exempt: DEFAULT_VALIDATION_EXEMPT_PATHS
                .iter()
                .filter_map(|p| PathPattern::parse(p).ok())
                .collect(),
        }
    }
}

fn compile<I>(patterns: I) -> Result<Vec<PathPattern>, PatternError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| PathPattern::parse(p.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PathPattern::parse(pattern).unwrap().matches(path)
    }

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(matches("/favicon.ico", "/favicon.ico"));
        assert!(!matches("/favicon.ico", "/favicon.icon"));
        assert!(!matches("/api/users/checkBlogName", "/api/users/checkblogname"));
        assert!(!matches("/api/users", "/api/users/1"));
    }

    #[test]
    fn double_star_spans_zero_or_more_segments() {
        assert!(matches("/api/auth/login/**", "/api/auth/login"));
        assert!(matches("/api/auth/login/**", "/api/auth/login/kakao"));
        assert!(matches("/api/auth/login/**", "/api/auth/login/oauth2/code/google"));
        assert!(!matches("/api/auth/login/**", "/api/auth/logout"));
        assert!(matches("/**/openapi.json", "/api/news-service/openapi.json"));
    }

    #[test]
    fn single_star_stays_inside_one_segment() {
        assert!(matches("/api/*/profile", "/api/users/profile"));
        assert!(!matches("/api/*/profile", "/api/users/me/profile"));
        assert!(!matches("/api/*/profile", "/api/profile"));
        assert!(matches("/api/*-service/v3/api-docs", "/api/blog-service/v3/api-docs"));
        assert!(!matches("/api/*-service/v3/api-docs", "/api/blog-svc/v3/api-docs"));
    }

    #[test]
    fn question_mark_matches_one_character() {
        assert!(matches("/api/v?/docs", "/api/v3/docs"));
        assert!(!matches("/api/v?/docs", "/api/v10/docs"));
    }

    #[test]
    fn wildcard_backtracks() {
        assert!(matches("/files/*.tar.gz", "/files/a.b.tar.gz"));
        assert!(matches("/files/a*b*c", "/files/aXbYbZc"));
        assert!(!matches("/files/a*b*c", "/files/aXbYbZ"));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert_eq!(PathPattern::parse("  ").unwrap_err(), PatternError::Empty);
        assert_eq!(
            PathPattern::parse("api/**").unwrap_err(),
            PatternError::NotAbsolute("api/**".to_string())
        );
    }

    #[test]
    fn default_lists_classify_known_endpoints() {
        let classifier = PathClassifier::default();

        assert_eq!(classifier.classify("/favicon.ico"), PathCategory::Anonymous);
        assert_eq!(classifier.classify("/api/swagger-ui/index.html"), PathCategory::Anonymous);
        assert_eq!(
            classifier.classify("/api/stock-integration-service/openapi.json"),
            PathCategory::Anonymous
        );
        assert_eq!(
            classifier.classify("/api/auth/reissue"),
            PathCategory::ValidationExempt
        );
        assert_eq!(classifier.classify("/api/users/profile"), PathCategory::Protected);
        assert_eq!(classifier.classify("/"), PathCategory::Protected);
    }

    #[test]
    fn trailing_and_doubled_separators_are_significant() {
        assert!(!matches("/favicon.ico", "/favicon.ico/"));
        assert!(!matches("/api/auth/reissue", "/api/auth/reissue//"));
        assert!(!matches("/api/users/checkBlogName", "/api//users/checkBlogName"));
        assert!(matches("/api/auth/login/**", "/api/auth/login/"));

        let classifier = PathClassifier::default();
        assert_eq!(classifier.classify("/favicon.ico/"), PathCategory::Protected);
        assert_eq!(classifier.classify("/api/auth/reissue/"), PathCategory::Protected);
    }

    #[test]
    fn only_listed_service_docs_are_anonymous() {
        let classifier = PathClassifier::default();

        assert_eq!(
            classifier.classify("/api/blog-service/v3/api-docs"),
            PathCategory::Anonymous
        );
        assert_eq!(
            classifier.classify("/api/billing-service/v3/api-docs"),
            PathCategory::Protected
        );
        assert_eq!(
            classifier.classify("/api/blog-service/openapi.json"),
            PathCategory::Protected
        );
    }

    #[test]
    fn dot_segments_are_not_canonical() {
        assert!(is_canonical("/api/users/profile"));
        assert!(is_canonical("/api/files/report.v2..pdf"));
        assert!(is_canonical("/"));

        for path in [
            "/api/kis/stocks/../../users/profile",
            "/api/kis/stocks/%2e%2e/%2E%2E/users/profile",
            "/api/kis/stocks/.%2e/x",
            "/api/./users/profile",
            "/api/kis/stocks/..",
            "/api/kis/stocks/..\\..\\users",
        ] {
            assert!(!is_canonical(path), "{path}");
        }
    }

    #[test]
    fn anonymous_wins_over_validation_exempt() {
        let classifier = PathClassifier::new(["/api/auth/**"], ["/api/auth/reissue"]).unwrap();

        assert_eq!(classifier.classify("/api/auth/reissue"), PathCategory::Anonymous);
    }

    #[test]
    fn classification_is_stable() {
        let classifier = PathClassifier::default();

        for path in ["/favicon.ico", "/api/auth/reissue", "/api/users/profile"] {
            assert_eq!(classifier.classify(path), classifier.classify(path));
        }
    }
}
