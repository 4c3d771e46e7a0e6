//! XDR definitions for the MATH program.
//!
//! ```text
//! struct AddRequest     { int summand1; int summand2; };
//! struct AddResponse    { int result; string equation<>; };
//! struct DivideRequest  { float dividend; float divisor; };
//! struct ErrorMessage   { int errorCode; string errorMessage<>; };
//! struct DivideResponse { float result; string equation<>; ErrorMessage errorMessage; };
//!
//! program MATH_PROGRAM {
//!     version MATH_V1 {
//!         void           MATHPROC_NULL(void)          = 0;
//!         AddResponse    MATHPROC_ADD(AddRequest)     = 1;
//!         DivideResponse MATHPROC_DIVIDE(DivideRequest) = 2;
//!     } = 1;
//! } = 0x20004455;
//! ```

use num_derive::{FromPrimitive, ToPrimitive};

use super::{DeserializeStruct, SerializeStruct};

/// MATH program number, taken from the user-defined range (0x20000000-0x3fffffff).
pub const PROGRAM: u32 = 0x2000_4455;
/// MATH protocol version
pub const VERSION: u32 = 1;

/// `errorCode` of a division that succeeded.
pub const ERROR_CODE_OK: i32 = 0;
/// `errorCode` of a division whose arguments were rejected.
pub const ERROR_CODE_INVALID_ARGUMENT: i32 = 1;

/// Procedure numbers of the MATH version 1 program.
#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum MathProgram {
    MATHPROC_NULL = 0,
    MATHPROC_ADD = 1,
    MATHPROC_DIVIDE = 2,
    /// Any procedure number not listed above
    INVALID,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddRequest {
    pub summand1: i32,
    pub summand2: i32,
}
DeserializeStruct!(AddRequest, summand1, summand2);
SerializeStruct!(AddRequest, summand1, summand2);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddResponse {
    pub result: i32,
    /// Rendered as `"<summand1> + <summand2> = <result>"`
    pub equation: String,
}
DeserializeStruct!(AddResponse, result, equation);
SerializeStruct!(AddResponse, result, equation);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DivideRequest {
    pub dividend: f32,
    pub divisor: f32,
}
DeserializeStruct!(DivideRequest, dividend, divisor);
SerializeStruct!(DivideRequest, dividend, divisor);

/// Outcome of a call that can fail on its arguments.
///
/// `error_code == 0` exactly when `error_message` is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorMessage {
    pub error_code: i32,
    pub error_message: String,
}
DeserializeStruct!(ErrorMessage, error_code, error_message);
SerializeStruct!(ErrorMessage, error_code, error_message);

impl ErrorMessage {
    pub fn ok() -> ErrorMessage {
        ErrorMessage { error_code: ERROR_CODE_OK, error_message: String::new() }
    }

    pub fn invalid_argument(reason: &str) -> ErrorMessage {
        ErrorMessage {
            error_code: ERROR_CODE_INVALID_ARGUMENT,
            error_message: format!("Invalid argument: {reason}"),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error_code == ERROR_CODE_OK
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DivideResponse {
    /// Only meaningful when `error_message.is_ok()`
    pub result: f32,
    /// Rendered as `"<dividend> / <divisor> = <result>"`, or `= N/A` on error
    pub equation: String,
    pub error_message: ErrorMessage,
}
DeserializeStruct!(DivideResponse, result, equation, error_message);
SerializeStruct!(DivideResponse, result, equation, error_message);
