//! Reference-data seeding commands.

use std::path::Path;

use shoppy_store::db::countries::CountryRepository;

/// Default part categories for a fresh install.
const DEFAULT_CATEGORIES: [&str; 8] = [
    "CPU",
    "GPU",
    "RAM",
    "Motherboard",
    "Hard drive",
    "Power supply",
    "Case",
    "Cooling",
];

/// Default characteristic labels for a fresh install.
const DEFAULT_CHARACTERISTIC_NAMES: [&str; 6] = [
    "RAM memory capacity",
    "Warranty",
    "Clock speed",
    "Socket",
    "Capacity",
    "Wattage",
];

/// Load the checkout country list from a `name, code` file, replacing any
/// previously seeded rows.
pub async fn countries(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(file)?;
    let parsed = parse_countries(&contents)?;

    let pool = super::connect().await?;
    CountryRepository::new(&pool).replace_all(&parsed).await?;

    tracing::info!(count = parsed.len(), "countries seeded");
    Ok(())
}

/// Insert default categories and characteristic labels, skipping any that
/// already exist.
pub async fn catalog() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    for name in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&pool)
            .await?;
    }

    for name in DEFAULT_CHARACTERISTIC_NAMES {
        sqlx::query(
            "INSERT INTO characteristic_names (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .execute(&pool)
        .await?;
    }

    tracing::info!("catalog reference data seeded");
    Ok(())
}

/// Parse `name, code` lines into (name, code) pairs. Blank lines are skipped.
/// The code is whatever follows the last `, `, so names containing commas
/// (e.g. "Korea, Republic of") survive.
fn parse_countries(contents: &str) -> Result<Vec<(String, String)>, String> {
    let mut parsed = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (name, code) = line
            .rsplit_once(", ")
            .ok_or_else(|| format!("line {}: expected `name, code`", number + 1))?;
        parsed.push((name.to_owned(), code.to_owned()));
    }
    Ok(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_countries() {
        let parsed = parse_countries("United States, US\n\nKorea, Republic of, KR\n").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("United States".to_owned(), "US".to_owned()),
                ("Korea, Republic of".to_owned(), "KR".to_owned()),
            ]
        );
    }

    #[test]
    fn test_parse_countries_rejects_bad_line() {
        assert!(parse_countries("nocode").is_err());
    }
}
