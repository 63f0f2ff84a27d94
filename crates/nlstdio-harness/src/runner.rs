//! Executes fixture cases against the core.
//!
//! Each `function` has its own input shape:
//!
//! - `snprintf`, `sniprintf`: `{format, args, capacity, locale?}`; the output
//!   is the buffer up to its terminator.
//! - `asprintf`: `{format, args, locale?}`.
//! - `decode_string`: `{bytes, max_chars?, locale}`; `max_chars: null`
//!   counts only. Output `{chars, rest}` where `rest` is the number of
//!   unconsumed source bytes, or null once the terminator was read.
//! - `encode_string`: `{wide, max_bytes?, locale}`; output `{bytes, rest}`.
//! - `decode_one`: `{chunks, locale}`; successive calls sharing one state,
//!   a null chunk being the reset call. Output lists each call's result.
//!
//! Printf arguments are tagged objects: `{"int": -1}`, `{"uint": 1}`,
//! `{"float": 1.5}` (or `"inf"`, `"-inf"`, `"nan"`), `{"char": 65}`,
//! `{"wide_char": 8364}`, `{"str": "x"}`, `{"wide_str": "x"}` (null for a
//! null pointer), `{"pointer": 4096}`, `{"count": 0}`.

use std::cell::Cell;

use nlstdio_core::StdioError;
use nlstdio_core::locale::{self, Encoding, Locale};
use nlstdio_core::multibyte::{self, ConversionState};
use nlstdio_core::stdio::{self, FormatArg};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::fixtures::{FixtureCase, FixtureSet};
use crate::verify::{Observed, VerificationResult};

/// Runs fixture sets and collects one verdict per case.
#[derive(Debug, Default)]
pub struct TestRunner {
    filter: Option<String>,
}

impl TestRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only run cases whose `function` equals `function`.
    #[must_use]
    pub fn only(function: impl Into<String>) -> Self {
        Self {
            filter: Some(function.into()),
        }
    }

    #[must_use]
    pub fn run(&self, set: &FixtureSet) -> Vec<VerificationResult> {
        set.cases
            .iter()
            .filter(|case| self.filter.as_ref().is_none_or(|f| *f == case.function))
            .map(|case| match execute(case) {
                Ok(observed) => VerificationResult::compare(&set.family, case, &observed),
                Err(reason) => VerificationResult::aborted(&set.family, case, reason),
            })
            .collect()
    }
}

/// `StdioError` variant name, as fixtures spell it.
#[must_use]
pub fn error_name(err: &StdioError) -> &'static str {
    match err {
        StdioError::IncompleteSequence => "IncompleteSequence",
        StdioError::InvalidSequence => "InvalidSequence",
        StdioError::OutputError { .. } => "OutputError",
        StdioError::MalformedDirective { .. } => "MalformedDirective",
        StdioError::InsufficientSpace { .. } => "InsufficientSpace",
        StdioError::ArgumentMismatch { .. } => "ArgumentMismatch",
        StdioError::Overflow => "Overflow",
    }
}

/// Run one case, with its locale installed for this thread only. The
/// thread goes back to the process locale afterwards.
pub fn execute(case: &FixtureCase) -> Result<Observed, String> {
    let locale = match case.inputs.get("locale").and_then(serde_json::Value::as_str) {
        Some(name) => Some(Locale::parse(name).map_err(|e| e.to_string())?),
        None => None,
    };
    locale::use_thread_locale(locale.as_ref());
    let result = dispatch(case);
    locale::use_thread_locale(None);
    result
}

fn dispatch(case: &FixtureCase) -> Result<Observed, String> {
    let inputs = &case.inputs;
    match case.function.as_str() {
        "snprintf" => run_fixed(inputs, stdio::snprintf),
        "sniprintf" => run_fixed(inputs, stdio::sniprintf),
        "asprintf" => run_growable(inputs, stdio::asprintf),
        "asiprintf" => run_growable(inputs, stdio::asiprintf),
        "decode_string" => run_decode_string(inputs),
        "encode_string" => run_encode_string(inputs),
        "decode_one" => run_decode_one(inputs),
        other => Err(format!("unsupported function {other}")),
    }
}

fn parse<T: DeserializeOwned>(inputs: &serde_json::Value) -> Result<T, String> {
    T::deserialize(inputs).map_err(|e| format!("bad inputs: {e}"))
}

fn observed(output: String, result: Result<usize, StdioError>) -> Observed {
    match result {
        Ok(n) => Observed {
            output,
            ret: i64::try_from(n).ok(),
            error: None,
        },
        Err(err) => Observed {
            output,
            ret: None,
            error: Some(error_name(&err).to_string()),
        },
    }
}

// ---------------------------------------------------------------------------
// printf family
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FloatValue {
    Number(f64),
    Special(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ArgSpec {
    Int(i64),
    Uint(u64),
    Float(FloatValue),
    Char(u8),
    WideChar(u32),
    Str(Option<String>),
    WideStr(Option<String>),
    Pointer(usize),
    Count(i64),
}

/// Owned backing storage for one `FormatArg`.
enum OwnedArg {
    Plain(FormatArg<'static>),
    Str(Option<Vec<u8>>),
    WideStr(Option<Vec<u32>>),
    Count(Cell<i64>),
}

impl OwnedArg {
    fn from_spec(spec: ArgSpec) -> Result<Self, String> {
        Ok(match spec {
            ArgSpec::Int(v) => Self::Plain(FormatArg::Int(v)),
            ArgSpec::Uint(v) => Self::Plain(FormatArg::Uint(v)),
            ArgSpec::Float(FloatValue::Number(v)) => Self::Plain(FormatArg::Float(v)),
            ArgSpec::Float(FloatValue::Special(name)) => {
                let v = match name.as_str() {
                    "inf" => f64::INFINITY,
                    "-inf" => f64::NEG_INFINITY,
                    "nan" => f64::NAN,
                    "-nan" => -f64::NAN,
                    other => return Err(format!("unknown float literal {other:?}")),
                };
                Self::Plain(FormatArg::Float(v))
            }
            ArgSpec::Char(c) => Self::Plain(FormatArg::Char(c)),
            ArgSpec::WideChar(wc) => Self::Plain(FormatArg::WideChar(wc)),
            ArgSpec::Str(s) => Self::Str(s.map(String::into_bytes)),
            ArgSpec::WideStr(s) => Self::WideStr(s.map(|s| s.chars().map(u32::from).collect())),
            ArgSpec::Pointer(p) => Self::Plain(FormatArg::Pointer(p)),
            ArgSpec::Count(init) => Self::Count(Cell::new(init)),
        })
    }

    fn as_arg(&self) -> FormatArg<'_> {
        match self {
            Self::Plain(arg) => *arg,
            Self::Str(s) => FormatArg::Str(s.as_deref()),
            Self::WideStr(s) => FormatArg::WideStr(s.as_deref()),
            Self::Count(cell) => FormatArg::Count(cell),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PrintfInputs {
    format: String,
    #[serde(default)]
    args: Vec<ArgSpec>,
    #[serde(default)]
    capacity: usize,
}

fn owned_args(specs: Vec<ArgSpec>) -> Result<Vec<OwnedArg>, String> {
    specs.into_iter().map(OwnedArg::from_spec).collect()
}

type FixedFn = fn(&mut [u8], &[u8], &[FormatArg<'_>]) -> nlstdio_core::Result<usize>;
type GrowableFn = fn(&[u8], &[FormatArg<'_>]) -> nlstdio_core::Result<Vec<u8>>;

fn run_fixed(inputs: &serde_json::Value, f: FixedFn) -> Result<Observed, String> {
    let PrintfInputs { format, args, capacity } = parse(inputs)?;
    let owned = owned_args(args)?;
    let args: Vec<FormatArg<'_>> = owned.iter().map(OwnedArg::as_arg).collect();
    let mut buf = vec![0u8; capacity];
    let result = f(&mut buf, format.as_bytes(), &args);
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(observed(String::from_utf8_lossy(&buf[..end]).into_owned(), result))
}

fn run_growable(inputs: &serde_json::Value, f: GrowableFn) -> Result<Observed, String> {
    let PrintfInputs { format, args, .. } = parse(inputs)?;
    let owned = owned_args(args)?;
    let args: Vec<FormatArg<'_>> = owned.iter().map(OwnedArg::as_arg).collect();
    Ok(match f(format.as_bytes(), &args) {
        Ok(bytes) => {
            let n = bytes.len();
            observed(String::from_utf8_lossy(&bytes).into_owned(), Ok(n))
        }
        Err(err) => observed(String::new(), Err(err)),
    })
}

// ---------------------------------------------------------------------------
// Multibyte codec
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DecodeStringInputs {
    bytes: Vec<u8>,
    #[serde(default)]
    max_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EncodeStringInputs {
    wide: Vec<u32>,
    #[serde(default)]
    max_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DecodeOneInputs {
    chunks: Vec<Option<Vec<u8>>>,
}

fn encoding() -> Encoding {
    locale::current_encoding()
}

fn run_decode_string(inputs: &serde_json::Value) -> Result<Observed, String> {
    let DecodeStringInputs { bytes, max_chars } = parse(inputs)?;
    let mut dst = max_chars.map(|n| vec![0u32; n]);
    let mut cursor = Some(bytes.as_slice());
    let mut state = ConversionState::new();
    let result = multibyte::decode_string(encoding(), dst.as_deref_mut(), &mut cursor, Some(&mut state));
    let output = json!({
        "chars": dst.unwrap_or_default(),
        "rest": cursor.map(<[u8]>::len),
    });
    Ok(observed(output.to_string(), result))
}

fn run_encode_string(inputs: &serde_json::Value) -> Result<Observed, String> {
    let EncodeStringInputs { wide, max_bytes } = parse(inputs)?;
    let mut dst = max_bytes.map(|n| vec![0u8; n]);
    let mut cursor = Some(wide.as_slice());
    let mut state = ConversionState::new();
    let result = multibyte::encode_string(encoding(), dst.as_deref_mut(), &mut cursor, Some(&mut state));
    let output = json!({
        "bytes": dst.unwrap_or_default(),
        "rest": cursor.map(<[u32]>::len),
    });
    Ok(observed(output.to_string(), result))
}

fn run_decode_one(inputs: &serde_json::Value) -> Result<Observed, String> {
    let DecodeOneInputs { chunks } = parse(inputs)?;
    let enc = encoding();
    let mut state = ConversionState::new();
    let mut calls = Vec::with_capacity(chunks.len());
    let mut last = Ok(0);
    for chunk in &chunks {
        let mut wc = 0u32;
        last = multibyte::decode_one(enc, Some(&mut wc), chunk.as_deref(), Some(&mut state));
        calls.push(match (&last, chunk) {
            (Ok(n), Some(_)) => json!({"ret": n, "wc": wc}),
            (Ok(n), None) => json!({"ret": n}),
            (Err(err), _) => json!({"error": error_name(err)}),
        });
    }
    Ok(observed(serde_json::Value::Array(calls).to_string(), last))
}
