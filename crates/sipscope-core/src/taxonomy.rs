//! Static SIP status and vendor subcode taxonomy.
//!
//! The taxonomy is a closed, read-only knowledge base: status codes map to a
//! short operator-facing explanation and a technical explanation, vendor
//! subcodes map to a description, cause and resolution, and a fixed set of
//! status codes is grouped into error categories. Lookups never fail; codes
//! without an entry resolve to an explicit `Unknown` variant so callers can
//! synthesize placeholder text.
//!
//! One instance is built on first use (`Taxonomy::global`) and shared
//! read-only for the rest of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Version of the bundled tables. Bump when entries change.
pub const TAXONOMY_VERSION: u32 = 3;

/// Subcode used when a record carries no vendor subcode.
pub const NO_SUBCODE: u32 = 0;

/// Three-digit SIP status code (100..=999).
///
/// # Examples
/// ```
/// use sipscope_core::StatusCode;
///
/// let code = StatusCode::new(404).unwrap();
/// assert_eq!(code.class_digit(), 4);
/// assert!(StatusCode::new(42).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const MIN: u16 = 100;
    pub const MAX: u16 = 999;

    pub fn new(value: u16) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Leading digit of the code (1 for 1xx, 4 for 4xx, ...).
    pub fn class_digit(self) -> u8 {
        (self.0 / 100) as u8
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse error grouping of failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCategory {
    Authentication,
    Routing,
    Capacity,
    Protocol,
    Network,
    Configuration,
    Uncategorized,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication",
            ErrorCategory::Routing => "Routing",
            ErrorCategory::Capacity => "Capacity",
            ErrorCategory::Protocol => "Protocol",
            ErrorCategory::Network => "Network",
            ErrorCategory::Configuration => "Configuration",
            ErrorCategory::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explanation texts for one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: u16,
    pub explanation: &'static str,
    pub technical: &'static str,
}

/// Diagnostic texts for one vendor subcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcodeEntry {
    pub code: u32,
    pub description: &'static str,
    pub cause: &'static str,
    pub resolution: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLookup {
    Known(&'static StatusEntry),
    Unknown(StatusCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubcodeLookup {
    Known(&'static SubcodeEntry),
    Unknown(u32),
}

/// Read-only lookup tables, built once per process.
#[derive(Debug)]
pub struct Taxonomy {
    statuses: HashMap<u16, &'static StatusEntry>,
    subcodes: HashMap<u32, &'static SubcodeEntry>,
}

impl Taxonomy {
    /// Shared instance.
    pub fn global() -> &'static Taxonomy {
        static TAXONOMY: OnceLock<Taxonomy> = OnceLock::new();
        TAXONOMY.get_or_init(Taxonomy::build)
    }

    fn build() -> Self {
        Self {
            statuses: STATUS_ENTRIES.iter().map(|e| (e.code, e)).collect(),
            subcodes: SUBCODE_ENTRIES.iter().map(|e| (e.code, e)).collect(),
        }
    }

    pub fn status(&self, code: StatusCode) -> StatusLookup {
        match self.statuses.get(&code.as_u16()).copied() {
            Some(entry) => StatusLookup::Known(entry),
            None => StatusLookup::Unknown(code),
        }
    }

    pub fn subcode(&self, code: u32) -> SubcodeLookup {
        match self.subcodes.get(&code).copied() {
            Some(entry) => SubcodeLookup::Known(entry),
            None => SubcodeLookup::Unknown(code),
        }
    }

    /// Class name for the code's leading digit.
    pub fn category(&self, code: StatusCode) -> &'static str {
        match code.class_digit() {
            1 => "Provisional",
            2 => "Success",
            3 => "Redirection",
            4 => "Client Error",
            5 => "Server Error",
            6 => "Global Failure",
            _ => UNKNOWN_CATEGORY,
        }
    }

    /// First matching error category; table order decides overlaps (502).
    pub fn error_category(&self, code: StatusCode) -> ErrorCategory {
        ERROR_CATEGORIES
            .iter()
            .find(|(_, codes)| codes.contains(&code.as_u16()))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::Uncategorized)
    }
}

pub const UNKNOWN_CATEGORY: &str = "Unknown Category";

const ERROR_CATEGORIES: &[(ErrorCategory, &[u16])] = &[
    (ErrorCategory::Authentication, &[401, 407]),
    (ErrorCategory::Routing, &[404, 480, 484, 485, 502, 504]),
    (ErrorCategory::Capacity, &[486, 503, 513]),
    (ErrorCategory::Protocol, &[400, 405, 415, 420, 421, 505]),
    (ErrorCategory::Network, &[408, 483, 500, 502]),
    (ErrorCategory::Configuration, &[403, 488, 501, 606]),
];

macro_rules! status {
    ($code:literal, $explanation:literal, $technical:literal) => {
        StatusEntry {
            code: $code,
            explanation: $explanation,
            technical: $technical,
        }
    };
}

const STATUS_ENTRIES: &[StatusEntry] = &[
    // 1xx
    status!(
        100,
        "Call is being processed. Please wait.",
        "Trying - The request is being processed, but no definitive response is available yet."
    ),
    status!(
        180,
        "Phone is ringing at the destination.",
        "Ringing - The destination user agent is alerting the user."
    ),
    status!(
        181,
        "Call is being redirected to another number.",
        "Call Is Being Forwarded - The call is being redirected to another destination."
    ),
    status!(
        182,
        "Call is in a queue and will be handled soon.",
        "Queued - The request is queued and will be processed soon."
    ),
    status!(
        183,
        "Call setup is in progress.",
        "Session Progress - Provides progress information about the call setup."
    ),
    // 2xx
    status!(
        200,
        "Call connected successfully.",
        "OK - The request has been successfully processed and accepted."
    ),
    status!(
        202,
        "Request accepted and will be processed.",
        "Accepted - The request has been accepted for processing, but not completed yet."
    ),
    // 3xx
    status!(
        300,
        "Multiple call destinations found.",
        "Multiple Choices - The requested address resolves to multiple destinations."
    ),
    status!(
        301,
        "Call destination has permanently changed.",
        "Moved Permanently - The requested address is no longer valid and has a new permanent address."
    ),
    status!(
        302,
        "Call destination is temporarily different.",
        "Moved Temporarily - The requested address is temporarily unavailable and has a new temporary address."
    ),
    status!(
        305,
        "You must use a specific network route.",
        "Use Proxy - The client must use the specified proxy to reach the destination."
    ),
    status!(
        380,
        "Alternative communication method available.",
        "Alternative Service - The request cannot be fulfilled, but an alternative service is available."
    ),
    // 4xx
    status!(
        400,
        "Invalid call request. Check the number.",
        "Bad Request - The request could not be understood due to malformed syntax."
    ),
    status!(
        401,
        "Authentication required to complete the call.",
        "Unauthorized - The request requires user authentication."
    ),
    status!(
        403,
        "Call blocked or not allowed.",
        "Forbidden - The server understood the request but refuses to authorize it."
    ),
    status!(
        404,
        "Phone number or user not found.",
        "Not Found - The requested user could not be located on the server."
    ),
    status!(
        405,
        "Calling method not permitted.",
        "Method Not Allowed - The specified method is not allowed for the requested address."
    ),
    status!(
        406,
        "Call cannot be completed due to incompatible settings.",
        "Not Acceptable - The requested resource cannot generate content matching the client's Accept headers."
    ),
    status!(
        407,
        "Proxy authentication needed.",
        "Proxy Authentication Required - The client must first authenticate with the proxy."
    ),
    status!(
        408,
        "No response from the destination. Timeout occurred.",
        "Request Timeout - No response was received from the destination in a timely manner."
    ),
    status!(
        410,
        "Number is no longer in service.",
        "Gone - The requested resource is no longer available and will not be available again."
    ),
    status!(
        413,
        "Call request too large to process.",
        "Request Entity Too Large - The request payload exceeds server processing capabilities."
    ),
    status!(
        414,
        "Phone number too complicated to dial.",
        "Request-URI Too Long - The request URI exceeds the server's maximum processing length."
    ),
    status!(
        415,
        "Unsupported communication method.",
        "Unsupported Media Type - The request includes a media type the server cannot process."
    ),
    status!(
        416,
        "Unrecognized phone number format.",
        "Unsupported URI Scheme - The request contains a URI scheme the server does not support."
    ),
    status!(
        420,
        "Unsupported communication feature.",
        "Bad Extension - The server does not understand a specified SIP extension."
    ),
    status!(
        421,
        "Missing required communication feature.",
        "Extension Required - The server requires a specific extension not present in the request."
    ),
    status!(
        423,
        "Call setup time too short.",
        "Interval Too Brief - The request's expiration interval is too short."
    ),
    status!(
        480,
        "Destination temporarily unavailable.",
        "Temporarily Unavailable - The destination cannot be reached but might be available later."
    ),
    status!(
        481,
        "Call cannot be found or tracked.",
        "Call/Transaction Does Not Exist - The call or transaction referenced does not exist."
    ),
    status!(
        482,
        "Call routing has created a loop.",
        "Loop Detected - The request indicates a loop in the routing path."
    ),
    status!(
        483,
        "Too many network hops to complete call.",
        "Too Many Hops - Maximum number of routing hops has been exceeded."
    ),
    status!(484, "Incomplete phone number.", "Address Incomplete - The request URI is incomplete."),
    status!(
        485,
        "Unclear which number to call.",
        "Ambiguous - The request URI is ambiguous and could not be resolved uniquely."
    ),
    status!(
        486,
        "Destination is currently busy.",
        "Busy Here - The destination is currently busy and cannot accept the call."
    ),
    status!(
        487,
        "Call was cancelled or stopped.",
        "Request Terminated - The request was terminated by the user or network."
    ),
    status!(
        488,
        "Call cannot be accepted by recipient.",
        "Not Acceptable Here - The request cannot be accepted by the recipient."
    ),
    // 5xx
    status!(
        500,
        "Network error. Unable to complete call.",
        "Server Internal Error - An unexpected condition prevented request fulfillment."
    ),
    status!(
        501,
        "Call feature not supported.",
        "Not Implemented - The server does not support the functionality required."
    ),
    status!(
        502,
        "Network routing problem.",
        "Bad Gateway - The server received an invalid response from another server."
    ),
    status!(
        503,
        "Network overloaded or maintenance.",
        "Service Unavailable - The server is temporarily overloaded or under maintenance."
    ),
    status!(
        504,
        "Network route timeout.",
        "Server Time-out - No response received from an upstream server."
    ),
    status!(
        505,
        "Unsupported communication protocol.",
        "Version Not Supported - The SIP version is not supported."
    ),
    status!(
        513,
        "Call request too large.",
        "Message Too Large - The message exceeds the server's processing capabilities."
    ),
    // 6xx
    status!(
        600,
        "User is busy everywhere.",
        "Busy Everywhere - The requested user is busy across all possible locations."
    ),
    status!(603, "Call explicitly rejected.", "Decline - The user explicitly declines the call."),
    status!(
        604,
        "User does not exist.",
        "Does Not Exist Anywhere - The user cannot be found at any location."
    ),
    status!(
        606,
        "Call settings prevent connection.",
        "Not Acceptable - The user's preferences do not allow the call to be completed."
    ),
];

const SUBCODE_ENTRIES: &[SubcodeEntry] = &[
    SubcodeEntry {
        code: NO_SUBCODE,
        description: "No additional details available",
        cause: "No vendor subcode was reported",
        resolution: "Use the SIP status code for diagnosis",
    },
    SubcodeEntry {
        code: 560404,
        description: "User or number not found",
        cause: "The dialed number is invalid or user does not exist",
        resolution: "Verify the phone number and user existence in the system.",
    },
    SubcodeEntry {
        code: 560480,
        description: "Temporary service interruption",
        cause: "Service is temporarily unavailable",
        resolution: "Wait for service restoration and retry. Check service status.",
    },
    SubcodeEntry {
        code: 560486,
        description: "Network busy or user unavailable",
        cause: "The destination user agent or network is temporarily unavailable",
        resolution: "Retry the call after a brief delay. If persistent, check network conditions.",
    },
    SubcodeEntry {
        code: 560487,
        description: "Call cancelled or network timeout",
        cause: "The call was terminated due to timeout or user cancellation",
        resolution: "Check network latency and connection stability.",
    },
    SubcodeEntry {
        code: 560503,
        description: "Service currently unavailable",
        cause: "System overload or maintenance",
        resolution: "Wait for service restoration. If persistent, contact support.",
    },
];
