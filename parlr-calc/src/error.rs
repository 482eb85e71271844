//! Calculator-specific lexical errors.
//!
//! [`CalcError`] covers failures the lexer can run into while turning bytes
//! into symbols. The parser-side error surface is `parlr::ParseError`; lexer
//! failures are wrapped into its `Scan` variant with the offending span
//! attached.

use thiserror::Error;

/// All failures the calculator lexer can produce.
///
/// Conversions from underlying error types are derived with `#[from]`, so
/// `?` works in functions returning `Result<T, CalcError>`.
#[derive(Debug, Error)]
pub enum CalcError {
    /// A byte with no role in the calculator syntax.
    #[error("stray byte {byte:?}")]
    StrayByte {
        /// The offending byte.
        byte: u8,
    },

    /// An integer literal could not be parsed (out of `i64` range).
    #[error("unable to parse {0:?}")]
    ParseInt(#[from] std::num::ParseIntError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_error_trait_obj(e: &dyn std::error::Error) -> &dyn std::error::Error {
        e
    }

    #[test]
    fn parse_int_maps_to_calc_error() {
        let res: Result<i64, CalcError> = "notanumber".parse::<i64>().map_err(CalcError::from);
        let err = res.unwrap_err();
        assert!(matches!(err, CalcError::ParseInt(_)));
        let _ = _assert_error_trait_obj(&err);
        assert!(err.to_string().contains("unable to parse"));
    }

    #[test]
    fn stray_byte_names_the_byte() {
        let err = CalcError::StrayByte { byte: b'@' };
        assert!(err.to_string().contains("stray byte"));
    }

    fn _assert_send_sync_static<T: Send + Sync + 'static>() {}
    #[test]
    fn calc_error_is_send_sync_static() {
        _assert_send_sync_static::<CalcError>();
    }
}
