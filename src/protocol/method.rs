//! RPC method codes carried in the frame header.

/// Remote procedure named by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Exchange credentials for a session id.
    Authenticate,
    /// Run a statement within a session.
    Execute,
    /// Release a session; one-way, never answered.
    Signout,
}

impl Method {
    /// Whether the server answers this method with a reply frame.
    #[must_use]
    pub const fn expects_reply(self) -> bool { !matches!(self, Self::Signout) }
}

impl TryFrom<u16> for Method {
    type Error = u16;

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Authenticate),
            2 => Ok(Self::Execute),
            3 => Ok(Self::Signout),
            other => Err(other),
        }
    }
}

impl From<Method> for u16 {
    fn from(m: Method) -> Self {
        match m {
            Method::Authenticate => 1,
            Method::Execute => 2,
            Method::Signout => 3,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticate => f.write_str("authenticate"),
            Self::Execute => f.write_str("execute"),
            Self::Signout => f.write_str("signout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Method::Authenticate, 1, true)]
    #[case(Method::Execute, 2, true)]
    #[case(Method::Signout, 3, false)]
    fn wire_codes_and_replies(#[case] method: Method, #[case] raw: u16, #[case] replies: bool) {
        assert_eq!(u16::from(method), raw);
        assert_eq!(Method::try_from(raw), Ok(method));
        assert_eq!(method.expects_reply(), replies);
    }

    #[test]
    fn unknown_codes_are_returned() {
        assert_eq!(Method::try_from(0), Err(0));
        assert_eq!(Method::try_from(4), Err(4));
    }
}
