//! Parser configuration data.
//!
//! [`Options`] is the passive, caller-facing option set. Grammar rules never
//! read it directly; they consume a [`Snapshot`], the frozen form with all
//! name sets deduplicated and case-folded. The facade builds a snapshot
//! lazily on first use and rebuilds it only after the options were mutated.

use crate::parser::ParseError;
use phf::Set;
use std::collections::HashSet;
use unicase::UniCase;

/// Tag names whose content is opaque raw text rather than wikitext.
static DEFAULT_PARSER_TAGS: Set<&str> = phf::phf_set! {
    "charinsert", "gallery", "graph", "hiero", "imagemap", "indicator",
    "math", "nowiki", "poem", "pre", "ref", "references", "score",
    "source", "syntaxhighlight", "templatedata", "timeline",
};

/// Tag names that are always self-closing, even without an explicit `/>`.
static DEFAULT_SELF_CLOSING_ONLY_TAGS: Set<&str> = phf::phf_set! {
    "br", "hr", "wbr",
};

/// Magic word names matched case-sensitively.
static DEFAULT_MAGIC_WORDS_CASE_SENSITIVE: Set<&str> = phf::phf_set! {
    "ARTICLEPAGENAME", "ARTICLESPACE", "BASEPAGENAME", "CURRENTDAY",
    "CURRENTDAY2", "CURRENTDAYNAME", "CURRENTDOW", "CURRENTHOUR",
    "CURRENTMONTH", "CURRENTMONTHABBREV", "CURRENTMONTHNAME",
    "CURRENTTIME", "CURRENTTIMESTAMP", "CURRENTWEEK", "CURRENTYEAR",
    "FULLPAGENAME", "NAMESPACE", "NAMESPACENUMBER", "NUMBEROFARTICLES",
    "NUMBEROFPAGES", "PAGEID", "PAGENAME", "REVISIONID", "REVISIONUSER",
    "ROOTPAGENAME", "SITENAME", "SUBJECTPAGENAME", "SUBJECTSPACE",
    "SUBPAGENAME", "TALKPAGENAME", "TALKSPACE",
};

/// Magic word names matched case-insensitively. These are mostly parser
/// functions, which keep their leading `#` as part of the name.
static DEFAULT_MAGIC_WORDS_CASE_INSENSITIVE: Set<&str> = phf::phf_set! {
    "#expr", "#if", "#ifeq", "#iferror", "#ifexist", "#ifexpr",
    "#invoke", "#language", "#rel2abs", "#switch", "#tag", "#time",
    "#titleparts", "anchorencode", "canonicalurl", "defaultsort",
    "displaytitle", "filepath", "formatnum", "fullurl", "gender",
    "grammar", "int", "lc", "lcfirst", "localurl", "ns", "nse",
    "padleft", "padright", "plural", "uc", "ucfirst", "urlencode",
};

/// Namespace prefixes that denote image links.
static DEFAULT_IMAGE_NAMESPACES: Set<&str> = phf::phf_set! {
    "file", "image", "media",
};

/// Protocols recognized for external links.
static DEFAULT_URL_PROTOCOLS: Set<&str> = phf::phf_set! {
    "ftp://", "ftps://", "git://", "gopher://", "http://", "https://",
    "irc://", "ircs://", "mailto:", "mms://", "news:", "nntp://",
    "sftp://", "ssh://", "svn://", "telnet://", "worldwind://",
};

/// Caller-facing parser options.
///
/// Name lists left as `None` fall back to the built-in defaults; a supplied
/// list replaces the default set entirely. The struct is plain data: it can
/// be mutated freely between parses, and the owning
/// [`WikitextParser`](crate::WikitextParser) refreezes it on the next parse.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Tag names whose content is parsed as opaque raw text.
    pub parser_tags: Option<Vec<String>>,
    /// Tag names that are always self-closing, even without `/>`.
    pub self_closing_only_tags: Option<Vec<String>>,
    /// Template names parsed as magic words, matched case-sensitively.
    pub magic_words_case_sensitive: Option<Vec<String>>,
    /// Template names parsed as magic words, matched case-insensitively.
    pub magic_words_case_insensitive: Option<Vec<String>>,
    /// Wikilink namespace prefixes that denote image links.
    pub image_namespaces: Option<Vec<String>>,
    /// Protocols accepted in external link targets.
    pub url_protocols: Option<Vec<String>>,
    /// Accept `{{}}` and `{{|…}}` instead of degrading them to plain text.
    pub allow_empty_template_name: bool,
    /// Accept `[[]]` and `[[|…]]` instead of degrading them to plain text.
    pub allow_empty_wikilink_target: bool,
    /// Accept `[]` and `[ text]` instead of degrading them to plain text.
    pub allow_empty_external_link_target: bool,
    /// Tolerate a missing `}}` or closing tag by inferring the closing mark
    /// at the nearest valid boundary.
    pub allow_closing_mark_inference: bool,
    /// Record a source span on every parsed node.
    pub with_line_info: bool,
}

impl Options {
    /// Creates the default option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The frozen form of [`Options`] consumed by grammar rules.
///
/// All name sets are deduplicated and case-normalized up front so the hot
/// rules only perform hash lookups. A snapshot is immutable and may be read
/// by any number of concurrent parses.
#[derive(Debug)]
pub(crate) struct Snapshot {
    parser_tags: HashSet<UniCase<String>>,
    self_closing_only_tags: HashSet<UniCase<String>>,
    magic_words_case_sensitive: HashSet<String>,
    magic_words_case_insensitive: HashSet<UniCase<String>>,
    image_namespaces: HashSet<UniCase<String>>,
    /// Protocol prefixes, lowercased, longest first so that `ftps://` wins
    /// over `ftp://` when both match.
    protocols: Vec<String>,
    pub allow_empty_template_name: bool,
    pub allow_empty_wikilink_target: bool,
    pub allow_empty_external_link_target: bool,
    pub allow_closing_mark_inference: bool,
    pub with_line_info: bool,
}

impl Snapshot {
    /// Freezes the given options.
    ///
    /// Fails with [`ParseError::Usage`] when a supplied name list contains an
    /// entry the grammar could never match, since that always indicates a
    /// caller bug rather than an exotic configuration.
    pub fn freeze(options: &Options) -> Result<Self, ParseError> {
        let parser_tags = folded_set("parser_tags", &options.parser_tags, &DEFAULT_PARSER_TAGS)?;
        let self_closing_only_tags = folded_set(
            "self_closing_only_tags",
            &options.self_closing_only_tags,
            &DEFAULT_SELF_CLOSING_ONLY_TAGS,
        )?;
        let magic_words_case_insensitive = folded_set(
            "magic_words_case_insensitive",
            &options.magic_words_case_insensitive,
            &DEFAULT_MAGIC_WORDS_CASE_INSENSITIVE,
        )?;
        let image_namespaces = folded_set(
            "image_namespaces",
            &options.image_namespaces,
            &DEFAULT_IMAGE_NAMESPACES,
        )?;

        let magic_words_case_sensitive = match &options.magic_words_case_sensitive {
            Some(names) => {
                for name in names {
                    check_name("magic_words_case_sensitive", name)?;
                }
                names.iter().cloned().collect()
            }
            None => DEFAULT_MAGIC_WORDS_CASE_SENSITIVE
                .iter()
                .map(|n| (*n).to_string())
                .collect(),
        };

        let mut protocols: Vec<String> = match &options.url_protocols {
            Some(protocols) => {
                for proto in protocols {
                    if proto.trim().is_empty() || proto.contains(char::is_whitespace) {
                        return Err(ParseError::Usage(format!(
                            "invalid url_protocols entry {proto:?}"
                        )));
                    }
                }
                protocols.iter().map(|p| p.to_ascii_lowercase()).collect()
            }
            None => DEFAULT_URL_PROTOCOLS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        };
        protocols.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        protocols.dedup();

        Ok(Self {
            parser_tags,
            self_closing_only_tags,
            magic_words_case_sensitive,
            magic_words_case_insensitive,
            image_namespaces,
            protocols,
            allow_empty_template_name: options.allow_empty_template_name,
            allow_empty_wikilink_target: options.allow_empty_wikilink_target,
            allow_empty_external_link_target: options.allow_empty_external_link_target,
            allow_closing_mark_inference: options.allow_closing_mark_inference,
            with_line_info: options.with_line_info,
        })
    }

    /// Returns true if `name` is a parser tag whose body is raw text.
    pub fn is_parser_tag(&self, name: &str) -> bool {
        self.parser_tags.contains(&UniCase::new(name.to_string()))
    }

    /// Returns true if `name` always parses as a self-closing tag.
    pub fn is_self_closing_only_tag(&self, name: &str) -> bool {
        self.self_closing_only_tags
            .contains(&UniCase::new(name.to_string()))
    }

    /// Returns true if a template named `name` is a magic word.
    pub fn is_magic_word(&self, name: &str) -> bool {
        self.magic_words_case_sensitive.contains(name)
            || self
                .magic_words_case_insensitive
                .contains(&UniCase::new(name.to_string()))
    }

    /// Returns true if `namespace` denotes an image link.
    pub fn is_image_namespace(&self, namespace: &str) -> bool {
        self.image_namespaces
            .contains(&UniCase::new(namespace.trim().to_string()))
    }

    /// Returns the protocol prefix matching the start of `text`, if any.
    pub fn match_protocol(&self, text: &str) -> Option<&str> {
        self.protocols.iter().map(String::as_str).find(|proto| {
            text.len() >= proto.len() && text[..proto.len()].eq_ignore_ascii_case(proto)
        })
    }
}

/// Builds a case-folded name set from an override list or a default set.
fn folded_set(
    option: &str,
    names: &Option<Vec<String>>,
    defaults: &Set<&str>,
) -> Result<HashSet<UniCase<String>>, ParseError> {
    match names {
        Some(names) => {
            for name in names {
                check_name(option, name)?;
            }
            Ok(names.iter().map(|n| UniCase::new(n.clone())).collect())
        }
        None => Ok(defaults
            .iter()
            .map(|n| UniCase::new((*n).to_string()))
            .collect()),
    }
}

/// Rejects names no tag or template could ever carry.
fn check_name(option: &str, name: &str) -> Result<(), ParseError> {
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(ParseError::Usage(format!("invalid {option} entry {name:?}")));
    }
    Ok(())
}
