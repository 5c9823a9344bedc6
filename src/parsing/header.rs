//! Validation of the pseudo-tag header at the top of a ctags tag file.

use thiserror::Error;

pub const FORMAT_LINE: &str =
    "!_TAG_FILE_FORMAT\t2\t/extended format; --format=1 will not append ;\" to lines/";
pub const SORTED_LINE: &str = "!_TAG_FILE_SORTED\t0\t/0=unsorted, 1=sorted, 2=foldcase/";
pub const PROGRAM_NAME_LINE: &str = "!_TAG_PROGRAM_NAME\tExuberant Ctags\t//";

const AUTHOR_TAG: &str = "!_TAG_PROGRAM_AUTHOR";
const URL_TAG: &str = "!_TAG_PROGRAM_URL";
const VERSION_TAG: &str = "!_TAG_PROGRAM_VERSION";

/// Number of header lines.
pub const HEADER_LINES: usize = 6;

#[derive(Error, Debug)]
pub enum TagFileError {
    #[error("tag file header is truncated after {0} lines")]
    TruncatedHeader(usize),

    #[error("unexpected header line {line}: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("failed to read tag file: {0}")]
    Io(#[from] std::io::Error),
}

pub type TagFileResult<T> = Result<T, TagFileError>;

/// Values recorded from a validated header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFileHeader {
    pub author: String,
    pub url: String,
    pub version: String,
}

impl TagFileHeader {
    /// Validate the six header lines in order.
    ///
    /// Format, sorted and program-name lines must match exactly. Author, URL and
    /// version lines must carry their tag names; their values are recorded.
    pub fn parse<I, S>(lines: I) -> TagFileResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = lines.into_iter();
        let mut next = |index: usize| -> TagFileResult<String> {
            lines
                .next()
                .map(|line| trim_line_end(line.as_ref()).to_string())
                .ok_or(TagFileError::TruncatedHeader(index))
        };

        expect_exact(1, &next(0)?, FORMAT_LINE)?;
        expect_exact(2, &next(1)?, SORTED_LINE)?;
        let author = expect_tag(3, &next(2)?, AUTHOR_TAG)?;
        expect_exact(4, &next(3)?, PROGRAM_NAME_LINE)?;
        let url = expect_tag(5, &next(4)?, URL_TAG)?;
        let version = expect_tag(6, &next(5)?, VERSION_TAG)?;

        Ok(Self {
            author,
            url,
            version,
        })
    }
}

fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn expect_exact(line: usize, found: &str, expected: &str) -> TagFileResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(TagFileError::HeaderMismatch {
            line,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

/// Checks `<tag>\t<value>\t<comment>` and returns the value.
fn expect_tag(line: usize, found: &str, tag: &str) -> TagFileResult<String> {
    let mut fields = found.split('\t');
    match (fields.next(), fields.next()) {
        (Some(name), Some(value)) if name == tag => Ok(value.to_string()),
        _ => Err(TagFileError::HeaderMismatch {
            line,
            expected: format!("{tag}\t<value>\t<comment>"),
            found: found.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) fn sample_header() -> Vec<String> {
    vec![
        FORMAT_LINE.to_string(),
        SORTED_LINE.to_string(),
        "!_TAG_PROGRAM_AUTHOR\tDarren Hiebert\t/dhiebert@users.sourceforge.net/".to_string(),
        PROGRAM_NAME_LINE.to_string(),
        "!_TAG_PROGRAM_URL\thttp://ctags.sourceforge.net\t/official site/".to_string(),
        "!_TAG_PROGRAM_VERSION\t5.8\t//".to_string(),
    ]
}
