use crate::peer::types::ServerConfig;
use rand::Rng;

/// Random endpoint identifier, also used as the glare tie-break key.
pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

// Функция для добавления схемы протокола к URL ICE сервера, если она отсутствует
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    // Если url уже начинается с "turn:" или "stun:", возвращаем как есть
    if config.url.starts_with("turn:") || config.url.starts_with("stun:") {
        config.url.clone()
    } else {
        // В зависимости от типа сервера добавляем нужную схему
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_added_by_server_type() {
        let turn = ServerConfig {
            id: "t".into(),
            r#type: "turn".into(),
            url: "turn.example.com:3478".into(),
            username: Some("u".into()),
            credential: Some("p".into()),
        };
        assert_eq!(add_ice_url_scheme(&turn), "turn:turn.example.com:3478");

        let stun = ServerConfig {
            id: "s".into(),
            r#type: "stun".into(),
            url: "stun:stun.example.com".into(),
            username: None,
            credential: None,
        };
        assert_eq!(add_ice_url_scheme(&stun), "stun:stun.example.com");
    }
}
