use rdkafka::config::ClientConfig;

use crate::config::ConsumerConfig;

/// Apply `config`'s security fields onto `cc`. Callers that want plaintext
/// can skip this entirely; it is a no-op when `security_protocol` is unset.
pub fn configure_security(cc: &mut ClientConfig, config: &ConsumerConfig) {
    let Some(protocol) = config.security_protocol.as_deref() else {
        return;
    };
    cc.set("security.protocol", protocol);

    if let Some(ca) = &config.ssl_ca_location {
        cc.set("ssl.ca.location", ca);
    }

    if protocol.eq_ignore_ascii_case("sasl_plaintext") || protocol.eq_ignore_ascii_case("sasl_ssl")
    {
        let mechanism = config.sasl_mechanism.as_deref().unwrap_or("SCRAM-SHA-512");
        cc.set("sasl.mechanism", mechanism);
        if let Some(user) = &config.sasl_username {
            cc.set("sasl.username", user);
        }
        if let Some(pass) = &config.sasl_password {
            cc.set("sasl.password", pass);
        }
    }
}
