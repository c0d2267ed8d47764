/// Connection details of the inbound shopper request that triggered a payment call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `X-Real-IP`, set by a same-origin proxy.
    pub real_ip: Option<String>,
    /// Raw `X-Forwarded-For` header: `client, proxy1, proxy2`.
    pub forwarded_for: Option<String>,
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_real_ip(mut self, ip: impl Into<String>) -> Self {
        self.real_ip = Some(ip.into());
        self
    }

    pub fn with_forwarded_for(mut self, header: impl Into<String>) -> Self {
        self.forwarded_for = Some(header.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Resolves the shopper's IP. Only the first forwarded hop is trusted.
    pub fn client_ip(&self) -> String {
        if let Some(ip) = &self.real_ip {
            return ip.clone();
        }
        if let Some(header) = &self.forwarded_for
            && let Some(first) = header.split(',').next()
        {
            return first.trim().to_string();
        }
        self.remote_addr.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_ip_wins() {
        let ctx = RequestContext::new()
            .with_real_ip("203.0.113.7")
            .with_forwarded_for("198.51.100.1")
            .with_remote_addr("10.0.0.1");
        assert_eq!(ctx.client_ip(), "203.0.113.7");
    }

    #[test]
    fn test_forwarded_for_uses_first_hop_only() {
        let ctx = RequestContext::new()
            .with_forwarded_for(" 198.51.100.1 , 10.0.0.2, 10.0.0.3")
            .with_remote_addr("10.0.0.1");
        assert_eq!(ctx.client_ip(), "198.51.100.1");
    }

    #[test]
    fn test_remote_addr_fallback() {
        let ctx = RequestContext::new().with_remote_addr("10.0.0.1");
        assert_eq!(ctx.client_ip(), "10.0.0.1");
    }

    #[test]
    fn test_empty_when_nothing_known() {
        assert_eq!(RequestContext::new().client_ip(), "");
    }
}
