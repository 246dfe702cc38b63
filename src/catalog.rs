use crate::utils::{format_thousands, opt_string_or_number, parse_leading_int, string_or_number};
use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashSet, fs, path::Path};
use tracing::{debug, error, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    All,
    Voucher,
    TopUp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nominal {
    pub id:             String,
    pub name:           String,
    pub price:          u64,
    pub original_price: u64,
    pub discount:       u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id:          String,
    pub name:        String,
    pub description: String,
    pub image:       String,
    pub category:    Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag:         Option<String>,
    #[serde(default)]
    pub is_trending: bool,
    pub nominals:    Vec<Nominal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id:       String,
    pub name:     String,
    pub category: String,
    pub icon:     String,
}

// ----------------------------------------------------------------------
// supplier wire shape
// ----------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct ApiProduct {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub sv_id:       Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub kode:        String,
    pub nama:        String,
    #[serde(deserialize_with = "string_or_number")]
    pub harga:       String,
    #[serde(default)]
    pub tag:         Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "isPostpaid")]
    pub is_postpaid: Option<bool>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiOperator {
    pub operator: String,
    #[serde(default, rename = "filterTag")]
    pub filter_tag: Option<Vec<String>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub produk: Vec<ApiProduct>,
}

// ----------------------------------------------------------------------
// display-name matchers
// ----------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PatternKey {
    DiamondFull,
    DiamondShort,
    Vouchers,
    Shell,
    Uc,
    PbCash,
    Cp,
    Coupons,
    StarQuartz,
    Credits,
    Ruby,
    BigCatCoins,
    Candies,
    GoldenStar,
    Gold,
    StarCredits,
    Coins,
    Rc,
    SteamIdr,
    SeaInvestment,
    WeeklyCard,
    SuperPass,
    SuperPassBundle,
    SuperVipCard,
    MonthlyCard,
}

struct ItemPattern {
    key:   PatternKey,
    regex: Regex,
    label: &'static str,
}

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("built-in pattern compiles")
}

// digits and word boundaries are ASCII only
static ITEM_PATTERNS: Lazy<Vec<ItemPattern>> = Lazy::new(|| {
    use PatternKey::*;
    [
        (DiamondFull,     r"([0-9]{1,3}(?:\.[0-9]{3})*|[0-9]+)\s*DIAMOND",  "Diamond"),
        (DiamondShort,    r"([0-9]{1,3}(?:\.[0-9]{3})*|[0-9]+)D(?-u:\b)",   "Diamond"),
        (Vouchers,        r"([0-9]+)\s*VOUCHERS?",                          "Voucher"),
        (Shell,           r"([0-9]+)\s*SHELL",                              "Shell"),
        (Uc,              r"([0-9]+)\s*UC(?-u:\b)",                         "UC"),
        (PbCash,          r"([0-9]+)\s*PB",                                 "PB Cash"),
        (Cp,              r"([0-9]+)\s*CP",                                 "CP"),
        (Coupons,         r"([0-9]+)\s*Coupons",                            "Coupons"),
        (StarQuartz,      r"Star Quartz\s*\*?\s*([0-9]+)",                  "Star Quartz"),
        (Credits,         r"([0-9]+)\s*Credits",                            "Credits"),
        (Ruby,            r"([0-9]+)\s*Ruby",                               "Ruby"),
        (BigCatCoins,     r"([0-9]+)\+([0-9]+)\s*Big Cat Coins",            "Big Cat Coins"),
        (Candies,         r"([0-9]+)\s*Candies",                            "Candies"),
        (GoldenStar,      r"([0-9]+)\s*Golden Star",                        "Golden Star"),
        (Gold,            r"([0-9]+)\s*Gold",                               "Gold"),
        (StarCredits,     r"([0-9]+)\s*Star Credits",                       "Star Credits"),
        (Coins,           r"([0-9]+)\s*Coins",                              "Coins"),
        (Rc,              r"([0-9]+)\s*RC(?-u:\b)",                         "RC"),
        (SteamIdr,        r"IDR\s*([0-9]{1,3}(?:[.,][0-9]{3})*|[0-9]+)",    "IDR"),
        (SeaInvestment,   r"(\(SEA\)\s*Investment\s*.+)",                   ""),
        (WeeklyCard,      r"WEEKLY\s*CARD",                                 "Weekly Card"),
        (SuperPass,       r"SUPER\s*PASS(?-u:\b)",                          "Super Pass"),
        (SuperPassBundle, r"SUPER\s*PASS\s*BUNDLE",                         "Super Pass Bundle"),
        (SuperVipCard,    r"SUPER\s*VIP\s*CARD",                            "Super VIP Card"),
        (MonthlyCard,     r"MONTHLY\s*CARD",                                "Monthly Card"),
    ]
    .into_iter()
    .map(|(key, pattern, label)| ItemPattern { key, regex: case_insensitive(pattern), label })
    .collect()
});

// `SUPER PASS` only counts when it is not the start of `SUPER PASS BUNDLE`
static BUNDLE_SUFFIX: Lazy<Regex> = Lazy::new(|| case_insensitive(r"^\s*BUNDLE"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| case_insensitive(r"\s+"));
static TOP_UP: Lazy<Regex> = Lazy::new(|| case_insensitive(r"TOP[-\s]?UP"));
static NON_SLUG: Lazy<Regex> = Lazy::new(|| case_insensitive(r"[^A-Za-z0-9_\s-]"));

fn first_match<'h>(p: &ItemPattern, hay: &'h str) -> Option<Captures<'h>> {
    if p.key == PatternKey::SuperPass {
        return p.regex.captures_iter(hay).find(|c| {
            let end = c.get(0).map_or(hay.len(), |m| m.end());
            !BUNDLE_SUFFIX.is_match(&hay[end..])
        });
    }
    p.regex.captures(hay)
}

fn format_match(p: &ItemPattern, caps: &Captures<'_>) -> Option<String> {
    use PatternKey::*;
    let first = caps.get(1).map(|m| m.as_str());
    match p.key {
        BigCatCoins => {
            let a: u64 = first?.parse().ok()?;
            let b: u64 = caps.get(2)?.as_str().parse().ok()?;
            Some(format!("{} {}", a.checked_add(b)?, p.label))
        }
        StarQuartz => Some(format!("{} {}", first?, p.label)),
        WeeklyCard | SuperPass | SuperPassBundle | SuperVipCard | MonthlyCard => {
            Some(p.label.to_string())
        }
        SeaInvestment => first.map(str::to_string),
        SteamIdr => {
            let digits: String = first?.chars().filter(|c| *c != '.' && *c != ',').collect();
            let amount: u64 = digits.parse().ok()?;
            Some(format!("IDR {}", format_thousands(amount)))
        }
        _ => Some(format!("{} {}", first?.replace('.', ""), p.label)),
    }
}

pub fn parse_nominal_display(nama: &str, operator: Option<&str>) -> String {
    let mut clean = WHITESPACE.replace_all(nama.trim(), " ").into_owned();
    if clean.is_empty() {
        return nama.to_string();
    }

    if operator.is_some_and(|op| op.to_uppercase().contains("METAL SLUG")) {
        let stripped = TOP_UP.replace_all(&clean, "").trim().to_string();
        clean = stripped;
    }

    for p in ITEM_PATTERNS.iter() {
        if let Some(caps) = first_match(p, &clean) {
            if let Some(name) = format_match(p, &caps) {
                return name;
            }
            // capture too large to be a number, keep the supplier's text
            return clean;
        }
    }

    clean
}

// voucher wins over top-up
pub fn classify(products: &[ApiProduct]) -> Category {
    let texts = || {
        products.iter().map(|p| {
            (
                p.nama.to_uppercase(),
                p.description.as_deref().unwrap_or("").to_uppercase(),
            )
        })
    };

    let is_voucher = texts().any(|(n, d)| n.contains("VOUCHER") || d.contains("VOUCHER"));
    if is_voucher {
        return Category::Voucher;
    }

    let is_top_up = texts().any(|(n, d)| {
        n.contains("TOP UP") || n.contains("TOP-UP") || d.contains("TOP UP") || d.contains("TOP-UP")
    });
    if is_top_up {
        Category::TopUp
    } else {
        Category::All
    }
}

pub fn slugify(operator: &str) -> String {
    let lower = operator.to_lowercase();
    let stripped = NON_SLUG.replace_all(&lower, "");
    WHITESPACE.replace_all(&stripped, "-").into_owned()
}

pub fn normalize_operator(op: &ApiOperator) -> Game {
    let mut seen = HashSet::new();
    let nominals = op.produk
        .iter()
        .filter(|p| seen.insert(p.kode.as_str()))
        .filter_map(|p| {
            let price = parse_leading_int(&p.harga).and_then(|v| u64::try_from(v).ok());
            let Some(price) = price else {
                debug!(operator = %op.operator, kode = %p.kode, harga = %p.harga, "dropping product with unparseable price");
                return None;
            };
            Some(Nominal {
                id:             p.kode.clone(),
                name:           parse_nominal_display(&p.nama, Some(&op.operator)),
                price,
                original_price: price,
                discount:       0,
            })
        })
        .collect();

    Game {
        id:          slugify(&op.operator),
        name:        op.operator.clone(),
        description: op.operator.clone(),
        image:       format!("/operators/{}.webp", op.operator),
        category:    classify(&op.produk),
        tag:         None,
        is_trending: false,
        nominals,
    }
}

pub fn normalize_operators(ops: &[ApiOperator]) -> Vec<Game> {
    let mut seen = HashSet::new();
    ops.iter()
        .map(normalize_operator)
        .filter(|g| seen.insert(g.id.clone()))
        .collect()
}

// a malformed operator is skipped, a malformed envelope is not
pub fn parse_catalog(body: Value) -> Result<Vec<Game>> {
    let status = body.get("status").and_then(Value::as_i64);
    let Some(Value::Array(data)) = body.get("data") else {
        bail!("invalid catalog response format: `data` is not an array");
    };
    if status != Some(200) {
        bail!("invalid catalog response format: status {:?}", status);
    }

    let ops: Vec<ApiOperator> = data
        .iter()
        .filter_map(|v| match serde_json::from_value::<ApiOperator>(v.clone()) {
            Ok(op) => Some(op),
            Err(e) => {
                warn!(error = %e, "skipping malformed operator");
                None
            }
        })
        .collect();

    Ok(normalize_operators(&ops))
}

async fn fetch_catalog(http: &Client, url: &str) -> Result<Vec<Game>> {
    let body: Value = http
        .get(url)
        .send()
        .await
        .context("GET supplier catalog")?
        .json()
        .await
        .context("decoding supplier catalog")?;
    parse_catalog(body)
}

pub async fn fetch_games(http: &Client, url: &str) -> Vec<Game> {
    match fetch_catalog(http, url).await {
        Ok(games) => {
            debug!(games = games.len(), "supplier catalog loaded");
            games
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to fetch games");
            Vec::new()
        }
    }
}

// ----------------------------------------------------------------------
// static seed catalog
// ----------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub games:           Vec<Game>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
}

impl SeedCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading seed catalog `{}`", path.display()))?;
        let seed: SeedCatalog = serde_json::from_str(&s)
            .with_context(|| format!("parsing `{}` as JSON", path.display()))?;
        Ok(seed)
    }

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn hot_games(&self, hot_ids: &[String]) -> Vec<Game> {
        self.games
            .iter()
            .filter(|g| g.is_trending || hot_ids.iter().any(|id| *id == g.id))
            .cloned()
            .collect()
    }

    pub fn payment_method(&self, key: &str) -> Option<&PaymentMethod> {
        self.payment_methods
            .iter()
            .find(|m| m.id == key || m.name == key)
    }
}

pub fn matches_category(game: &Game, category: Category) -> bool {
    category == Category::All || game.category == category
}

pub fn filter_games(games: Vec<Game>, category: Category, query: Option<&str>) -> Vec<Game> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    games
        .into_iter()
        .filter(|g| matches_category(g, category))
        .filter(|g| needle.as_ref().is_none_or(|n| g.name.to_lowercase().contains(n)))
        .collect()
}

pub fn format_price(price: u64) -> String {
    format_thousands(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(kode: &str, nama: &str, harga: &str, description: &str) -> ApiProduct {
        ApiProduct {
            sv_id:       None,
            kode:        kode.into(),
            nama:        nama.into(),
            harga:       harga.into(),
            tag:         None,
            description: Some(description.into()),
            is_postpaid: None,
        }
    }

    fn display(nama: &str) -> String {
        parse_nominal_display(nama, None)
    }

    #[test]
    fn diamonds_and_currency() {
        assert_eq!(display("56 Diamonds"), "56 Diamond");
        assert_eq!(display("1155 Diamonds"), "1155 Diamond");
        assert_eq!(display("MLBB 1.000 Diamond"), "1000 Diamond");
        assert_eq!(display("86D"), "86 Diamond");
        assert_eq!(display("IDR 50.000"), "IDR 50.000");
        assert_eq!(display("Steam Wallet IDR 120.000"), "IDR 120.000");
        assert_eq!(display("idr 6,000"), "IDR 6.000");
    }

    #[test]
    fn non_ascii_digits_are_not_amounts() {
        assert_eq!(display("٥٦ Diamonds"), "٥٦ Diamonds");
        assert_eq!(display("５６ Diamonds"), "５６ Diamonds");
        assert_eq!(display("IDR ５０.０００"), "IDR ５０.０００");
        assert_eq!(display("٨٦D"), "٨٦D");
    }

    #[test]
    fn unmatched_names_are_trimmed_and_collapsed() {
        assert_eq!(display("  Genesis   Crystal\tPack  "), "Genesis Crystal Pack");
        assert_eq!(display("   "), "   ");
    }

    #[test]
    fn order_decides_overlapping_patterns() {
        assert_eq!(display("100 Golden Star"), "100 Golden Star");
        assert_eq!(display("100 Gold"), "100 Gold");
        assert_eq!(display("120+12 Big Cat Coins"), "132 Big Cat Coins");
        assert_eq!(display("300 Coins"), "300 Coins");
        assert_eq!(display("50 Star Credits"), "50 Star Credits");
        assert_eq!(display("50 Credits"), "50 Credits");
        assert_eq!(display("Star Quartz *60"), "60 Star Quartz");
    }

    #[test]
    fn label_only_items() {
        assert_eq!(display("Weekly Card Diamond"), "Weekly Card");
        assert_eq!(display("WEEKLY CARD"), "Weekly Card");
        assert_eq!(display("Super Pass"), "Super Pass");
        assert_eq!(display("Super Pass Bundle"), "Super Pass Bundle");
        assert_eq!(display("super vip card"), "Super VIP Card");
        assert_eq!(display("MONTHLY CARD"), "Monthly Card");
        assert_eq!(display("(SEA) Investment Plan 5"), "(SEA) Investment Plan 5");
    }

    #[test]
    fn other_units() {
        assert_eq!(display("60 UC"), "60 UC");
        assert_eq!(display("1200 PB Cash"), "1200 PB Cash");
        assert_eq!(display("580 CP"), "580 CP");
        assert_eq!(display("25 Vouchers"), "25 Voucher");
        assert_eq!(display("40 RC"), "40 RC");
    }

    #[test]
    fn metal_slug_loses_its_top_up_suffix() {
        assert_eq!(
            parse_nominal_display("Top-Up Gem Pack", Some("Metal Slug Awakening")),
            "Gem Pack"
        );
        assert_eq!(
            parse_nominal_display("Top-Up Gem Pack", Some("Other Game")),
            "Top-Up Gem Pack"
        );
    }

    #[test]
    fn voucher_beats_top_up() {
        let ps = vec![
            product("a", "Top Up 5 Diamonds", "1000", ""),
            product("b", "Gift", "2000", "Voucher code delivered by mail"),
        ];
        assert_eq!(classify(&ps), Category::Voucher);

        let ps = vec![product("a", "5 Diamonds", "1000", "Top-up langsung")];
        assert_eq!(classify(&ps), Category::TopUp);

        let ps = vec![product("a", "5 Diamonds", "1000", "")];
        assert_eq!(classify(&ps), Category::All);
    }

    #[test]
    fn slug_rules() {
        assert_eq!(slugify("Mobile Legends"), "mobile-legends");
        assert_eq!(slugify("Tom & Jerry: Chase"), "tom-jerry-chase");
        assert_eq!(slugify("PUBG_Mobile  ID"), "pubg_mobile-id");
    }

    #[test]
    fn operator_normalization_dedupes_and_drops_bad_prices() {
        let op = ApiOperator {
            operator:   "Free Fire".into(),
            filter_tag: None,
            image:      None,
            produk: vec![
                product("FF5", "5 Diamonds", "1000", "top up"),
                product("FF5", "5 Diamonds again", "999", ""),
                product("FF12", "12 Diamonds", "abc", ""),
                product("FF50", "50 Diamonds", "7500", ""),
            ],
        };
        let g = normalize_operator(&op);
        assert_eq!(g.id, "free-fire");
        assert_eq!(g.image, "/operators/Free Fire.webp");
        assert_eq!(g.category, Category::TopUp);
        assert_eq!(g.nominals.len(), 2);
        assert_eq!(g.nominals[0].name, "5 Diamond");
        assert_eq!(g.nominals[0].price, 1000);
        assert_eq!(g.nominals[0].original_price, 1000);
        assert_eq!(g.nominals[0].discount, 0);
        assert_eq!(g.nominals[1].id, "FF50");
    }

    #[test]
    fn envelope_checks() {
        let ok = json!({
            "status": 200,
            "data": [
                { "operator": "Steam", "produk": [
                    { "kode": "ST50", "nama": "IDR 50.000", "harga": "52000", "description": "VOUCHER" }
                ]},
                { "operator": "Broken" },
                { "operator": "Steam", "produk": [] },
                { "nope": true }
            ]
        });
        let games = parse_catalog(ok).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].category, Category::Voucher);
        assert_eq!(games[0].nominals[0].name, "IDR 50.000");
        assert!(games[1].nominals.is_empty());

        assert!(parse_catalog(json!({ "status": 500, "data": [] })).is_err());
        assert!(parse_catalog(json!({ "status": 200, "data": {} })).is_err());
        assert!(parse_catalog(json!([])).is_err());
    }

    #[test]
    fn category_and_search_filters() {
        let seed: SeedCatalog = serde_json::from_value(json!({
            "games": [
                { "id": "ml", "name": "Mobile Legends", "description": "", "image": "",
                  "category": "top-up", "isTrending": true, "nominals": [] },
                { "id": "gp", "name": "Google Play", "description": "", "image": "",
                  "category": "voucher", "nominals": [] }
            ],
            "payment_methods": [
                { "id": "qris", "name": "QRIS", "category": "QRIS", "icon": "/q.svg" }
            ]
        })).unwrap();

        assert_eq!(filter_games(seed.games.clone(), Category::All, None).len(), 2);
        assert_eq!(filter_games(seed.games.clone(), Category::Voucher, None)[0].id, "gp");
        assert_eq!(filter_games(seed.games.clone(), Category::All, Some("legend"))[0].id, "ml");
        assert!(filter_games(seed.games.clone(), Category::Voucher, Some("legend")).is_empty());

        assert_eq!(seed.hot_games(&[]).len(), 1);
        assert_eq!(seed.hot_games(&["gp".into()]).len(), 2);
        assert_eq!(seed.payment_method("QRIS").map(|m| m.id.as_str()), Some("qris"));
        assert!(seed.game("gp").is_some());
    }
}
