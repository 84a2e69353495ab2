//! Primer-BLAST result page scanning
//!
//! Primer-BLAST has no machine-readable API; every state of a job is an HTML
//! page. This module recognises the handful of things the engine needs from
//! those pages with a small set of patterns, compiled once.

use regex::Regex;
use sdk::types::{Primer, PrimerPair};
use std::sync::OnceLock;

struct Patterns {
    running: Regex,
    job_key: Regex,
    no_intron: Regex,
    similar_templates: Regex,
    no_primers: Regex,
    pair_heading: Regex,
    primer_row: Regex,
    product_length: Regex,
    unintended: Regex,
    form_input: Regex,
    attr_name: Regex,
    attr_value: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let cell = r"\s*<td[^>]*>\s*(-?[0-9.]+)\s*</td>";
        let primer_row = format!(
            r"(?i)(forward|reverse)\s+primer\s*</th>\s*<td[^>]*>\s*([ACGTNacgtn]+)\s*</td>\s*<td[^>]*>\s*(plus|minus)\s*</td>{cell}{cell}{cell}{cell}{cell}{cell}{cell}"
        );

        Patterns {
            running: Regex::new(
                r#"(?i)this page will be automatically updated|<meta[^>]+http-equiv\s*=\s*"?refresh"#,
            )
            .expect("Invalid running pattern"),
            job_key: Regex::new(r#"job_key(?:"\s+value="|=)([A-Za-z0-9_\-]+)"#)
                .expect("Invalid job key pattern"),
            no_intron: Regex::new(
                r"(?i)no\s+introns?\b|(?:does\s+not|doesn't)\s+(?:contain|have)\s+(?:any\s+)?introns?",
            )
            .expect("Invalid intron pattern"),
            similar_templates: Regex::new(
                r"(?i)similar\s+to\s+(?:your|the)\s+(?:pcr\s+)?template",
            )
            .expect("Invalid similar templates pattern"),
            no_primers: Regex::new(
                r"(?i)no\s+(?:suitable\s+)?primers?\s+(?:pairs?\s+)?(?:were|was)\s+found|no\s+suitable\s+primers",
            )
            .expect("Invalid no primers pattern"),
            pair_heading: Regex::new(r"(?i)primer\s+pair\s+(\d+)").expect("Invalid pair pattern"),
            primer_row: Regex::new(&primer_row).expect("Invalid primer row pattern"),
            product_length: Regex::new(r"(?i)product\s+length\s*</th>\s*<td[^>]*>\s*(\d+)")
                .expect("Invalid product length pattern"),
            unintended: Regex::new(r"(?i)products?\s+on\s+(?:potentially\s+)?unintended\s+templates?")
                .expect("Invalid unintended pattern"),
            form_input: Regex::new(r"(?i)<input\b[^>]*>").expect("Invalid input pattern"),
            attr_name: Regex::new(r#"(?i)\bname\s*=\s*"([^"]*)""#).expect("Invalid name pattern"),
            attr_value: Regex::new(r#"(?i)\bvalue\s*=\s*"([^"]*)""#)
                .expect("Invalid value pattern"),
        }
    })
}

/// A primer pair as listed on the page, with its specificity verdict
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedPair {
    pub pair: PrimerPair,

    /// False when the pair also amplifies unintended templates
    pub specific: bool,
}

/// One page returned by Primer-BLAST
#[derive(Debug, Clone)]
pub struct ResultPage {
    html: String,
}

impl ResultPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// The page is an interim "still searching" page
    pub fn is_running(&self) -> bool {
        patterns().running.is_match(&self.html)
    }

    /// Job key advertised by the page, if any
    pub fn job_key(&self) -> Option<String> {
        patterns()
            .job_key
            .captures(&self.html)
            .map(|caps| caps[1].to_string())
    }

    /// The template has no intron to span
    pub fn reports_no_intron(&self) -> bool {
        patterns().no_intron.is_match(&self.html)
    }

    /// Form fields to resubmit when the service asks which similar templates
    /// to include
    ///
    /// Returns `None` unless the page is such a prompt. Hidden fields and
    /// pre-checked boxes are kept, so the service's own selection is accepted.
    pub fn similar_templates_form(&self) -> Option<Vec<(String, String)>> {
        let p = patterns();
        if !p.similar_templates.is_match(&self.html) {
            return None;
        }

        let fields: Vec<(String, String)> = p
            .form_input
            .find_iter(&self.html)
            .map(|m| m.as_str())
            .filter(|tag| {
                let lower = tag.to_ascii_lowercase();
                lower.contains("type=\"hidden\"")
                    || (lower.contains("type=\"checkbox\"") && lower.contains("checked"))
            })
            .filter_map(|tag| {
                let name = p.attr_name.captures(tag)?[1].to_string();
                let value = p
                    .attr_value
                    .captures(tag)
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_default();
                Some((name, value))
            })
            .collect();

        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }

    /// The service explicitly says no primers were found
    pub fn reports_no_primers(&self) -> bool {
        patterns().no_primers.is_match(&self.html)
    }

    /// Every readable primer pair on the page, in listed order
    pub fn primer_pairs(&self) -> Vec<ScannedPair> {
        let p = patterns();
        let headings: Vec<(usize, u32)> = p
            .pair_heading
            .captures_iter(&self.html)
            .filter_map(|caps| {
                let start = caps.get(0)?.start();
                let rank = caps[1].parse().ok()?;
                Some((start, rank))
            })
            .collect();

        headings
            .iter()
            .enumerate()
            .filter_map(|(i, &(start, rank))| {
                let end = headings
                    .get(i + 1)
                    .map(|&(next, _)| next)
                    .unwrap_or(self.html.len());
                let block = &self.html[start..end];
                let pair = parse_pair_block(rank, block);
                if pair.is_none() {
                    tracing::debug!("Skipping unreadable primer pair {}", rank);
                }
                pair.map(|pair| ScannedPair {
                    pair,
                    specific: !p.unintended.is_match(block),
                })
            })
            .collect()
    }
}

fn parse_pair_block(rank: u32, block: &str) -> Option<PrimerPair> {
    let p = patterns();
    let mut forward = None;
    let mut reverse = None;

    for caps in p.primer_row.captures_iter(block) {
        let primer = Primer {
            sequence: caps[2].to_ascii_uppercase(),
            strand: capitalize(&caps[3]),
            length: caps[4].parse().ok()?,
            start: caps[5].parse().ok()?,
            stop: caps[6].parse().ok()?,
            tm: caps[7].parse().ok()?,
            gc_percent: caps[8].parse().ok()?,
            self_complementarity: caps[9].parse().ok()?,
            self_3prime_complementarity: caps[10].parse().ok()?,
        };
        if caps[1].eq_ignore_ascii_case("forward") {
            forward.get_or_insert(primer);
        } else {
            reverse.get_or_insert(primer);
        }
    }

    let product_length = p.product_length.captures(block)?[1].parse().ok()?;

    Some(PrimerPair {
        rank,
        forward: forward?,
        reverse: reverse?,
        product_length,
    })
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Canned pages in the service's layout, shared by unit and integration tests
#[doc(hidden)]
pub mod fixtures {
    /// Interim page for a job that is still running
    pub fn running_page(job_key: &str) -> String {
        format!(
            r#"<html><head><meta http-equiv="refresh" content="30;URL=primertool.cgi?job_key={job_key}"></head>
<body><p>Job id={job_key}. This page will be automatically updated in 30 seconds.</p></body></html>"#
        )
    }

    /// One primer pair block; `unintended` adds an off-target product table
    pub fn pair_block(rank: u32, forward: &str, reverse: &str, unintended: bool) -> String {
        let off_target = if unintended {
            "<p>Products on potentially unintended templates</p><pre>XM_000001.1 product length = 412</pre>"
        } else {
            ""
        };
        format!(
            r#"<div class="prPairInfo"><h2>Primer pair {rank}</h2>
<table>
<tr><th>Sequence (5'->3')</th><th>Template strand</th><th>Length</th><th>Start</th><th>Stop</th><th>Tm</th><th>GC%</th><th>Self complementarity</th><th>Self 3' complementarity</th></tr>
<tr><th>Forward primer</th><td>{forward}</td><td>Plus</td><td>{flen}</td><td>101</td><td>120</td><td>59.87</td><td>50.00</td><td>3.00</td><td>1.00</td></tr>
<tr><th>Reverse primer</th><td>{reverse}</td><td>Minus</td><td>{rlen}</td><td>230</td><td>211</td><td>60.11</td><td>55.00</td><td>2.00</td><td>0.00</td></tr>
<tr><th>Product length</th><td>130</td></tr>
</table>
<p>Products on target templates</p>{off_target}</div>"#,
            flen = forward.len(),
            rlen = reverse.len(),
        )
    }

    /// Finished page listing the given pair blocks
    pub fn result_page(blocks: &[String], notes: &str) -> String {
        format!(
            "<html><body><h1>Primer-BLAST results</h1><p>{notes}</p>{}</body></html>",
            blocks.join("\n")
        )
    }

    /// Finished page with no primers
    pub fn no_primers_page(notes: &str) -> String {
        format!(
            "<html><body><p>{notes}</p><p>No primers were found! Try relaxing the primer constraints.</p></body></html>"
        )
    }

    /// Prompt asking which similar templates to include
    pub fn similar_templates_page(job_key: &str) -> String {
        format!(
            r#"<html><body><p>Primer-Blast found the following sequences that are similar to your PCR template.</p>
<form action="primertool.cgi" method="post">
<input type="hidden" name="job_key" value="{job_key}">
<input type="hidden" name="CMD" value="request">
<input type="checkbox" name="SELECTED_TEMPLATES" value="NM_001062476.2" checked>
<input type="checkbox" name="SELECTED_TEMPLATES" value="XM_015782903.1">
<input type="submit" value="Submit">
</form></body></html>"#
        )
    }
}
