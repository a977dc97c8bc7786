//! Display title of an audited site, derived from its domain.

use url::Url;

const MAX_TITLE_CHARS: usize = 512;

const DOMAIN_OVERRIDES: &[(&str, &str)] = &[
    ("bancoripley.com.pe", "Banco Ripley"),
    ("pichincha.pe", "Banco Pichincha"),
    ("banbif.com.pe", "BanBif"),
    ("bancognb.com.pe", "Banco GNB"),
    ("bancofalabella.pe", "Banco Falabella"),
    ("bn.com.pe", "Banco de la Nación"),
    ("viabcp.com", "BCP"),
    ("viabcp.com.pe", "BCP"),
    ("bancom.pe", "Banco de Comercio"),
    ("alfinbanco.pe", "Alfin Banco"),
    ("agrobanco.com.pe", "Agrobanco"),
];

const ACRONYMS: &[&str] = &["bcp", "gnb", "bbva", "bcr", "bn", "bif"];

const PE_SECOND_LEVEL: &[&str] = &["com", "gob", "org", "edu", "net"];

/// Registrable domain and its leading label, e.g. `("bn.com.pe", "bn")`
fn registrable_and_slug(host: &str) -> (String, String) {
    let parts: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
    let n = parts.len();
    if n >= 3 && parts[n - 1] == "pe" && PE_SECOND_LEVEL.contains(&parts[n - 2]) {
        (parts[n - 3..].join("."), parts[n - 3].to_string())
    } else if n >= 2 {
        (parts[n - 2..].join("."), parts[n - 2].to_string())
    } else {
        (host.to_string(), host.to_string())
    }
}

fn friendly_from_slug(slug: &str) -> String {
    let words: Vec<String> = slug
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            if ACRONYMS.contains(&w) {
                w.to_uppercase()
            } else {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect();
    if words.is_empty() {
        slug.to_string()
    } else {
        words.join(" ")
    }
}

/// Name shown for an audited page.
///
/// The site name from page metadata wins; otherwise a brand override or a name
/// built from the registrable domain. The raw `<title>` is ignored.
pub fn display_title(page_url: &str, site_name_meta: Option<&str>) -> String {
    let host = Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();
    let (registrable, slug) = registrable_and_slug(&host);

    let title = match site_name_meta.map(str::trim).filter(|s| !s.is_empty()) {
        Some(meta) => meta.to_string(),
        None => DOMAIN_OVERRIDES
            .iter()
            .find(|(domain, _)| *domain == registrable)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| friendly_from_slug(&slug)),
    };
    title.chars().take(MAX_TITLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peruvian_second_level_domains() {
        assert_eq!(display_title("https://www.bn.com.pe/inicio", None), "Banco de la Nación");
        assert_eq!(display_title("https://portal.sunat.gob.pe", None), "Sunat");
    }

    #[test]
    fn acronyms_and_meta() {
        assert_eq!(display_title("https://www.bbva.pe", None), "BBVA");
        assert_eq!(display_title("https://my-shop.com", None), "My Shop");
        assert_eq!(
            display_title("https://my-shop.com", Some(" Tienda ")),
            "Tienda"
        );
    }
}
