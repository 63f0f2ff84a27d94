//! Locale and character-encoding selection.
//!
//! The codec consults the active [`Encoding`] as an opaque rule table. The
//! process starts in the C locale (ASCII), like a C program that has not
//! called `setlocale`. A thread may override the process encoding for
//! itself, which is how `uselocale` behaves.

use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};

/// A multibyte character encoding known to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Encoding {
    /// 7-bit ASCII; the C and POSIX locales.
    #[default]
    Ascii = 0,
    /// ISO-8859-1, one byte per code point `0..=0xFF`.
    Latin1 = 1,
    Utf8 = 2,
    /// EUC-JP: JIS X 0208 pairs, `SS2` half-width kana, `SS3` JIS X 0212.
    EucJp = 3,
    ShiftJis = 4,
    /// ISO-2022-JP. The only encoding here with shift state.
    Jis = 5,
}

impl Encoding {
    pub const ALL: [Encoding; 6] = [
        Self::Ascii,
        Self::Latin1,
        Self::Utf8,
        Self::EucJp,
        Self::ShiftJis,
        Self::Jis,
    ];

    /// Canonical charset name, as reported by `nl_langinfo(CODESET)`.
    #[must_use]
    pub const fn charset_name(self) -> &'static str {
        match self {
            Self::Ascii => "ANSI_X3.4-1968",
            Self::Latin1 => "ISO-8859-1",
            Self::Utf8 => "UTF-8",
            Self::EucJp => "EUC-JP",
            Self::ShiftJis => "SJIS",
            Self::Jis => "JIS",
        }
    }

    /// Longest byte sequence one character may need (`MB_CUR_MAX`).
    #[must_use]
    pub const fn mb_cur_max(self) -> usize {
        match self {
            Self::Ascii | Self::Latin1 => 1,
            Self::Utf8 => 4,
            Self::EucJp => 3,
            Self::ShiftJis => 2,
            // Escape sequence plus a two-byte character, rounded up to MB_LEN_MAX.
            Self::Jis => 8,
        }
    }

    /// Whether decoding depends on shift state carried between calls.
    #[must_use]
    pub const fn is_stateful(self) -> bool {
        matches!(self, Self::Jis)
    }

    /// Look up an encoding by charset name. Case, `-` and `_` are ignored.
    #[must_use]
    pub fn from_charset(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "ASCII" | "USASCII" | "ANSIX3.41968" => Some(Self::Ascii),
            "ISO88591" | "LATIN1" => Some(Self::Latin1),
            "UTF8" => Some(Self::Utf8),
            "EUCJP" => Some(Self::EucJp),
            "SJIS" | "SHIFTJIS" => Some(Self::ShiftJis),
            "JIS" | "ISO2022JP" => Some(Self::Jis),
            _ => None,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Latin1,
            2 => Self::Utf8,
            3 => Self::EucJp,
            4 => Self::ShiftJis,
            5 => Self::Jis,
            _ => Self::Ascii,
        }
    }
}

/// Why a locale name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocaleError {
    #[error("empty locale name")]
    Empty,
    #[error("malformed locale name '{0}'")]
    InvalidName(String),
    #[error("unknown charset in locale name '{0}'")]
    UnknownCharset(String),
}

/// A parsed locale: its name and the character encoding it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    name: String,
    encoding: Encoding,
}

impl Locale {
    /// The C locale.
    #[must_use]
    pub fn c() -> Self {
        Self {
            name: String::from("C"),
            encoding: Encoding::Ascii,
        }
    }

    /// Parse `C`, `POSIX`, `C.<charset>` or `<lang>[_<territory>][.<charset>][@<modifier>]`.
    ///
    /// A language without a charset selects ISO-8859-1.
    pub fn parse(name: &str) -> Result<Self, LocaleError> {
        if name.is_empty() {
            return Err(LocaleError::Empty);
        }
        if name == "C" || name == "POSIX" {
            return Ok(Self {
                name: name.to_string(),
                encoding: Encoding::Ascii,
            });
        }

        let without_modifier = name.split_once('@').map_or(name, |(head, _)| head);
        let (lang, charset) = match without_modifier.split_once('.') {
            Some((lang, charset)) => (lang, Some(charset)),
            None => (without_modifier, None),
        };
        let lang_ok = !lang.is_empty()
            && lang
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_');
        if !lang_ok {
            return Err(LocaleError::InvalidName(name.to_string()));
        }

        let encoding = match charset {
            Some(charset) => Encoding::from_charset(charset)
                .ok_or_else(|| LocaleError::UnknownCharset(name.to_string()))?,
            None if lang == "C" || lang == "POSIX" => Encoding::Ascii,
            None => Encoding::Latin1,
        };
        Ok(Self {
            name: name.to_string(),
            encoding,
        })
    }

    /// Resolve the locale the environment asks for: `LC_ALL`, then
    /// `LC_CTYPE`, then `LANG`. A rejected name falls back to C.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// [`Locale::from_env`] over an arbitrary variable lookup.
    #[must_use]
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some((key, value)) = ["LC_ALL", "LC_CTYPE", "LANG"]
            .into_iter()
            .find_map(|key| lookup(key).filter(|v| !v.is_empty()).map(|v| (key, v)))
        else {
            return Self::c();
        };
        match Self::parse(&value) {
            Ok(locale) => {
                log::debug!(
                    "locale {} resolved from {key}, charset {}",
                    locale.name,
                    locale.encoding.charset_name()
                );
                locale
            }
            Err(err) => {
                log::warn!("ignoring {key}: {err}; using the C locale");
                Self::c()
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

static PROCESS_ENCODING: AtomicU8 = AtomicU8::new(Encoding::Ascii as u8);

thread_local! {
    static THREAD_OVERRIDE: Cell<Option<Encoding>> = const { Cell::new(None) };
}

/// Install `locale` as the process-wide `LC_CTYPE`.
pub fn set_global_locale(locale: &Locale) {
    PROCESS_ENCODING.store(locale.encoding as u8, Ordering::Release);
}

/// The process-wide encoding, ignoring any thread override.
#[must_use]
pub fn global_encoding() -> Encoding {
    Encoding::from_u8(PROCESS_ENCODING.load(Ordering::Acquire))
}

/// Override the encoding for the calling thread only; `None` returns the
/// thread to the process locale. Returns the previous override.
pub fn use_thread_locale(locale: Option<&Locale>) -> Option<Encoding> {
    THREAD_OVERRIDE
        .try_with(|cell| cell.replace(locale.map(Locale::encoding)))
        .unwrap_or(None)
}

/// The encoding in effect for the calling thread.
#[must_use]
pub fn current_encoding() -> Encoding {
    THREAD_OVERRIDE
        .try_with(Cell::get)
        .ok()
        .flatten()
        .unwrap_or_else(global_encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_and_posix_are_ascii() {
        assert_eq!(Locale::parse("C").unwrap().encoding(), Encoding::Ascii);
        assert_eq!(Locale::parse("POSIX").unwrap().encoding(), Encoding::Ascii);
    }

    #[test]
    fn charset_suffix_selects_encoding() {
        assert_eq!(Locale::parse("C.UTF-8").unwrap().encoding(), Encoding::Utf8);
        assert_eq!(
            Locale::parse("en_US.utf8").unwrap().encoding(),
            Encoding::Utf8
        );
        assert_eq!(
            Locale::parse("ja_JP.eucJP").unwrap().encoding(),
            Encoding::EucJp
        );
        assert_eq!(
            Locale::parse("ja_JP.SJIS").unwrap().encoding(),
            Encoding::ShiftJis
        );
        assert_eq!(Locale::parse("ja_JP.JIS").unwrap().encoding(), Encoding::Jis);
        assert_eq!(
            Locale::parse("de_DE.ISO-8859-1@euro").unwrap().encoding(),
            Encoding::Latin1
        );
    }

    #[test]
    fn language_without_charset_is_latin1() {
        assert_eq!(Locale::parse("en_US").unwrap().encoding(), Encoding::Latin1);
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(Locale::parse(""), Err(LocaleError::Empty));
        assert!(matches!(
            Locale::parse("en_US.KOI8-R"),
            Err(LocaleError::UnknownCharset(_))
        ));
        assert!(matches!(
            Locale::parse("../etc.UTF-8"),
            Err(LocaleError::InvalidName(_))
        ));
    }

    #[test]
    fn env_precedence_and_fallback() {
        let env = |key: &str| match key {
            "LC_ALL" => Some(String::new()),
            "LC_CTYPE" => Some(String::from("C.UTF-8")),
            "LANG" => Some(String::from("ja_JP.SJIS")),
            _ => None,
        };
        assert_eq!(Locale::from_env_with(env).encoding(), Encoding::Utf8);

        let bad = |key: &str| (key == "LANG").then(|| String::from("xx.NOPE"));
        assert_eq!(Locale::from_env_with(bad), Locale::c());
        assert_eq!(Locale::from_env_with(|_| None), Locale::c());
    }

    #[test]
    fn thread_override_is_thread_scoped() {
        let jis = Locale::parse("ja_JP.JIS").unwrap();
        let previous = use_thread_locale(Some(&jis));
        assert_eq!(current_encoding(), Encoding::Jis);
        let other = std::thread::spawn(current_encoding).join().unwrap();
        assert_eq!(other, global_encoding());
        use_thread_locale(None);
        assert_eq!(previous, None);
    }

    #[test]
    fn stateful_flag() {
        for enc in Encoding::ALL {
            assert_eq!(enc.is_stateful(), enc == Encoding::Jis);
            assert!(enc.mb_cur_max() >= 1);
        }
    }
}
