//! IPv4 address classification
//!
//! Derives the classful address class (A-E) and the special/private/public
//! type of an address. Both are ordered rule tables evaluated top to bottom;
//! the first matching row wins and its reason is reported with the result.
//!
//! # Examples
//!
//! ```
//! use ipkit_classify::{classify, AddressClass, AddressType};
//! use ipkit_core::Ipv4Address;
//!
//! let addr = Ipv4Address::parse("172.20.0.1").unwrap();
//! let result = classify(addr);
//! assert_eq!(result.address_class, AddressClass::B);
//! assert_eq!(result.address_type, AddressType::PrivateB);
//! ```

use ipkit_core::{Ipv4Address, Step};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classful address class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressClass {
    A,
    B,
    C,
    /// Multicast
    D,
    /// Experimental / reserved
    E,
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AddressClass::A => "A",
            AddressClass::B => "B",
            AddressClass::C => "C",
            AddressClass::D => "D",
            AddressClass::E => "E",
        };
        f.write_str(s)
    }
}

/// Special-purpose, private or public address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    Public,
    #[serde(rename = "Private-A")]
    PrivateA,
    #[serde(rename = "Private-B")]
    PrivateB,
    #[serde(rename = "Private-C")]
    PrivateC,
    Loopback,
    AllZeros,
    Broadcast,
    LinkLocal,
}

impl AddressType {
    /// Whether the type is one of the RFC 1918 private ranges
    pub fn is_private(self) -> bool {
        matches!(
            self,
            AddressType::PrivateA | AddressType::PrivateB | AddressType::PrivateC
        )
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AddressType::Public => "Public",
            AddressType::PrivateA => "Private-A",
            AddressType::PrivateB => "Private-B",
            AddressType::PrivateC => "Private-C",
            AddressType::Loopback => "Loopback",
            AddressType::AllZeros => "AllZeros",
            AddressType::Broadcast => "Broadcast",
            AddressType::LinkLocal => "LinkLocal",
        };
        f.write_str(s)
    }
}

/// One row of a decision table
struct Rule<T> {
    matches: fn([u8; 4]) -> bool,
    result: T,
    reason: &'static str,
}

const CLASS_RULES: &[Rule<AddressClass>] = &[
    Rule {
        matches: |o| o[0] < 128,
        result: AddressClass::A,
        reason: "first octet is between 0 and 127",
    },
    Rule {
        matches: |o| o[0] < 192,
        result: AddressClass::B,
        reason: "first octet is between 128 and 191",
    },
    Rule {
        matches: |o| o[0] < 224,
        result: AddressClass::C,
        reason: "first octet is between 192 and 223",
    },
    Rule {
        matches: |o| o[0] < 240,
        result: AddressClass::D,
        reason: "first octet is between 224 and 239 (multicast)",
    },
    Rule {
        matches: |_| true,
        result: AddressClass::E,
        reason: "first octet is between 240 and 255 (experimental)",
    },
];

const TYPE_RULES: &[Rule<AddressType>] = &[
    Rule {
        matches: |o| o == [127, 0, 0, 1],
        result: AddressType::Loopback,
        reason: "127.0.0.1 is the standard loopback address",
    },
    Rule {
        matches: |o| o == [0, 0, 0, 0],
        result: AddressType::AllZeros,
        reason: "0.0.0.0 stands for all networks",
    },
    Rule {
        matches: |o| o == [255, 255, 255, 255],
        result: AddressType::Broadcast,
        reason: "255.255.255.255 is the limited broadcast address",
    },
    Rule {
        matches: |o| o[0] == 10,
        result: AddressType::PrivateA,
        reason: "10.0.0.0/8 is reserved for private networks",
    },
    Rule {
        matches: |o| o[0] == 172 && (16..=31).contains(&o[1]),
        result: AddressType::PrivateB,
        reason: "172.16.0.0/12 is reserved for private networks",
    },
    Rule {
        matches: |o| o[0] == 192 && o[1] == 168,
        result: AddressType::PrivateC,
        reason: "192.168.0.0/16 is reserved for private networks",
    },
    Rule {
        matches: |o| o[0] == 169 && o[1] == 254,
        result: AddressType::LinkLocal,
        reason: "169.254.0.0/16 is used for link-local addressing",
    },
    Rule {
        matches: |_| true,
        result: AddressType::Public,
        reason: "not in any private or special range",
    },
];

fn first_match<T: Copy>(rules: &[Rule<T>], octets: [u8; 4]) -> (T, &'static str) {
    // Every table ends with a catch-all row.
    let rule = rules
        .iter()
        .find(|rule| (rule.matches)(octets))
        .unwrap_or(&rules[rules.len() - 1]);
    (rule.result, rule.reason)
}

/// Class and type of an address, with the rule that decided each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub address_class: AddressClass,
    pub class_reason: String,
    pub address_type: AddressType,
    pub type_reason: String,
}

/// Classify an address
pub fn classify(addr: Ipv4Address) -> Classification {
    let octets = addr.octets();
    let (address_class, class_reason) = first_match(CLASS_RULES, octets);
    let (address_type, type_reason) = first_match(TYPE_RULES, octets);

    Classification {
        address_class,
        class_reason: class_reason.to_string(),
        address_type,
        type_reason: type_reason.to_string(),
    }
}

/// Full analysis of one address
///
/// Carries the classification, the three text renderings and the step trace
/// explaining how each was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub address: Ipv4Address,
    #[serde(flatten)]
    pub classification: Classification,
    pub binary: String,
    pub hexadecimal: String,
    pub decimal: String,
    pub steps: Vec<Step>,
}

/// Classify an address and render it in binary, hex and decimal
///
/// # Examples
///
/// ```
/// use ipkit_classify::analyze;
/// use ipkit_core::Ipv4Address;
///
/// let analysis = analyze(Ipv4Address::parse("8.8.8.8").unwrap());
/// assert_eq!(analysis.hexadecimal, "08:08:08:08");
/// assert_eq!(analysis.decimal, "134,744,072");
/// ```
pub fn analyze(addr: Ipv4Address) -> Analysis {
    let classification = classify(addr);
    let octets = addr.octets();

    let mut steps = Vec::with_capacity(2 + 2 * octets.len());
    steps.push(Step::new(
        format!("Class {}", classification.address_class),
        classification.class_reason.clone(),
    ));
    steps.push(Step::new(
        format!("Type {}", classification.address_type),
        classification.type_reason.clone(),
    ));
    for octet in octets {
        steps.push(Step::new("Binary", format!("{} -> {:08b}", octet, octet)));
    }
    for octet in octets {
        steps.push(Step::new("Hexadecimal", format!("{} -> 0x{:02X}", octet, octet)));
    }

    Analysis {
        address: addr,
        classification,
        binary: addr.to_binary_text(),
        hexadecimal: addr.to_hex_text(),
        decimal: addr.to_decimal_text(),
        steps,
    }
}
