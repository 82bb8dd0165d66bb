//! Protocol version and server variant negotiation.

/// Client version string advertised in the connect payload.
pub const CLIENT_VERSION: &str = "1.11";

/// Known wire protocol versions, by game release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Unknown or unsupported number.
    Bad,
    /// 0.05 demo.
    Demo005,
    /// 1.00.
    Ver100,
    /// 1.11.
    Ver111,
    /// 2.00 expansion.
    Ver200,
    /// 2.11 expansion.
    Ver211,
    /// 2.40 expansion.
    Ver240,
}

impl ProtocolVersion {
    /// Map an advertised number to a known version; anything else is `Bad`.
    pub fn from_number(number: u32) -> Self {
        match number {
            5 => Self::Demo005,
            6 => Self::Ver100,
            8 => Self::Ver111,
            15 => Self::Ver200,
            16 => Self::Ver211,
            17 => Self::Ver240,
            _ => Self::Bad,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Self::Bad => 0,
            Self::Demo005 => 5,
            Self::Ver100 => 6,
            Self::Ver111 => 8,
            Self::Ver200 => 15,
            Self::Ver211 => 16,
            Self::Ver240 => 17,
        }
    }
}

/// Server variant, as advertised in the info response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Regular,
    /// Expansion servers expect a `clientType` field in the connect payload.
    Breakthrough,
}

impl ServerType {
    pub fn from_number(number: i32) -> Self {
        if number == 2 {
            Self::Breakthrough
        } else {
            Self::Regular
        }
    }
}

/// Negotiated pair of server variant and protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolType {
    pub server_type: ServerType,
    pub version: ProtocolVersion,
}

impl ProtocolType {
    pub fn new(server_type: ServerType, version: ProtocolVersion) -> Self {
        Self {
            server_type,
            version,
        }
    }

    pub fn protocol_version_number(&self) -> u32 {
        self.version.number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_numbers_roundtrip() {
        for n in [5u32, 6, 8, 15, 16, 17] {
            let v = ProtocolVersion::from_number(n);
            assert_ne!(v, ProtocolVersion::Bad);
            assert_eq!(v.number(), n);
        }
    }

    #[test]
    fn unknown_numbers_are_bad() {
        for n in [0u32, 1, 7, 18, 99] {
            assert_eq!(ProtocolVersion::from_number(n), ProtocolVersion::Bad);
        }
    }

    #[test]
    fn server_type_mapping() {
        assert_eq!(ServerType::from_number(2), ServerType::Breakthrough);
        assert_eq!(ServerType::from_number(0), ServerType::Regular);
        assert_eq!(ServerType::from_number(1), ServerType::Regular);
    }
}
