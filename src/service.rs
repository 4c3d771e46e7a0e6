//! Service module defines the interface between the MATH RPC protocol layer
//! and the code that actually computes results.
//!
//! The protocol handlers decode arguments, log the inbound request and hand
//! it to a [`MathService`]; whatever the service returns is encoded as the
//! procedure result. Domain failures such as division by zero are part of the
//! returned response, never a transport error.
//!
//! [`Calculator`] is the stock implementation used by the `math-server` binary.

use async_trait::async_trait;

use crate::protocol::xdr::math::{
    AddRequest, AddResponse, DivideRequest, DivideResponse, ErrorMessage,
};

/// The API to implement to serve the MATH program.
///
/// Implementations must always produce a well-formed response; the RPC
/// layer has no way to report a failure from here.
#[async_trait]
pub trait MathService: Sync {
    /// Adds two 32-bit integers.
    async fn add(&self, request: AddRequest) -> AddResponse;

    /// Divides two floats, reporting a zero divisor through
    /// [`DivideResponse::error_message`].
    async fn divide(&self, request: DivideRequest) -> DivideResponse;
}

/// Stateless arithmetic backing the demo server.
#[derive(Clone, Copy, Debug, Default)]
pub struct Calculator;

#[async_trait]
impl MathService for Calculator {
    async fn add(&self, request: AddRequest) -> AddResponse {
        add(request.summand1, request.summand2)
    }

    async fn divide(&self, request: DivideRequest) -> DivideResponse {
        divide(request.dividend, request.divisor)
    }
}

/// `summand1 + summand2`, wrapping on 32-bit overflow.
pub fn add(summand1: i32, summand2: i32) -> AddResponse {
    let result = summand1.wrapping_add(summand2);
    AddResponse { result, equation: format!("{summand1} + {summand2} = {result}") }
}

/// `dividend / divisor`, or an invalid-argument response when `divisor` is
/// zero of either sign.
pub fn divide(dividend: f32, divisor: f32) -> DivideResponse {
    let lhs = format!("{} / {}", format_float(dividend), format_float(divisor));
    if divisor == 0.0 {
        return DivideResponse {
            result: 0.0,
            equation: format!("{lhs} = N/A"),
            error_message: ErrorMessage::invalid_argument("Division by zero"),
        };
    }

    let result = dividend / divisor;
    DivideResponse {
        result,
        equation: format!("{lhs} = {}", format_float(result)),
        error_message: ErrorMessage::ok(),
    }
}

/// Renders a float with the shortest digits that identify it and at least
/// one fractional digit.
///
/// Magnitudes in `[1e-3, 1e7)` are written out (`42.0`, `0.5`), anything
/// else in scientific notation (`1.0E8`, `1.5E-4`). Non-finite values are
/// `Infinity`, `-Infinity` and `NaN`.
pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let name = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return name.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        // Debug keeps the `.0` and stays positional in this range
        return format!("{value:?}");
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}
