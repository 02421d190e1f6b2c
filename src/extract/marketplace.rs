//! Marketplace identification and per-marketplace DOM variants.
//!
//! The calculator panel renders differently per marketplace: different
//! field sets, different cell ordering, some fields absent entirely. The
//! differences live in one variant table keyed by marketplace code, not in
//! branches scattered across the extractor.

use url::Url;

/// Two-letter marketplace code derived from a product URL's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marketplace {
    Us,
    Uk,
    De,
    Ca,
    Au,
    Ae,
    /// Unrecognized marketplace; treated like a generic international
    /// layout.
    Other,
}

impl Marketplace {
    pub fn code(&self) -> &'static str {
        match self {
            Marketplace::Us => "us",
            Marketplace::Uk => "uk",
            Marketplace::De => "de",
            Marketplace::Ca => "ca",
            Marketplace::Au => "au",
            Marketplace::Ae => "ae",
            Marketplace::Other => "intl",
        }
    }

    fn from_code(code: &str) -> Marketplace {
        match code {
            "us" => Marketplace::Us,
            "uk" => Marketplace::Uk,
            "de" => Marketplace::De,
            "ca" => Marketplace::Ca,
            "au" => Marketplace::Au,
            "ae" => Marketplace::Ae,
            _ => Marketplace::Other,
        }
    }

    /// Derive the marketplace from a product URL. `co.xx` and `com.xx`
    /// suffixes resolve to the country part; a plain `.com` is the US
    /// marketplace; bare ccTLDs map directly.
    pub fn from_url(url: &str) -> Marketplace {
        let host = match Url::parse(url) {
            Ok(u) => match u.host_str() {
                Some(h) => h.to_string(),
                None => return Marketplace::Other,
            },
            Err(_) => return Marketplace::Other,
        };
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() < 2 {
            return Marketplace::Other;
        }
        let tld = parts[parts.len() - 1];
        let region = parts[parts.len() - 2];
        match region {
            "co" => Marketplace::from_code(tld),
            "com" => {
                if tld == "com" {
                    Marketplace::Us
                } else {
                    Marketplace::from_code(tld)
                }
            }
            _ => {
                if tld == "com" {
                    Marketplace::Us
                } else {
                    Marketplace::from_code(tld)
                }
            }
        }
    }

    pub fn variant(&self) -> &'static Variant {
        match self {
            Marketplace::Us => &US,
            Marketplace::Uk => &UK,
            Marketplace::De => &DE,
            Marketplace::Ca => &CA,
            Marketplace::Au => &AU,
            Marketplace::Ae => &AE,
            Marketplace::Other => &GENERIC,
        }
    }
}

/// How long to wait for calculator fields before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWait {
    /// Block until the test-id fields are present (within the budget).
    Required,
    /// This marketplace never exposes the field set; read immediately.
    Skip,
    /// Probe once, then read whatever is there.
    BestEffort,
}

/// Where the product price is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// `input[data-testid=...]` value.
    TestIdInput,
    /// Input inside the class-marked wrapper (no test id on this market).
    ContainerInput,
}

/// Where the seasonal storage fees are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageSource {
    /// Distinct Jan-Sep / Oct-Dec test-id panels.
    TestIdPanels,
    /// One shared positional cell holding the single published rate.
    SharedCell { index: usize },
}

/// Where the fulfillment fee is read from. A label-proximity fallback
/// runs behind either source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    /// Dedicated fee panel (primary marketplace only).
    PrimaryPanel,
    /// Positional generic cell.
    IndexedCell { index: usize },
}

/// The DOM variant descriptor for one marketplace.
#[derive(Debug, Clone, Copy)]
pub struct Variant {
    pub wait: FieldWait,
    pub price: PriceSource,
    pub storage: StorageSource,
    pub fee: FeeSource,
}

const US: Variant = Variant {
    wait: FieldWait::Required,
    price: PriceSource::TestIdInput,
    storage: StorageSource::TestIdPanels,
    fee: FeeSource::PrimaryPanel,
};

const UK: Variant = Variant {
    wait: FieldWait::Required,
    price: PriceSource::TestIdInput,
    storage: StorageSource::TestIdPanels,
    fee: FeeSource::IndexedCell { index: 11 },
};

const DE: Variant = UK;

const CA: Variant = Variant {
    wait: FieldWait::BestEffort,
    price: PriceSource::ContainerInput,
    storage: StorageSource::TestIdPanels,
    fee: FeeSource::IndexedCell { index: 8 },
};

const AU: Variant = CA;

const AE: Variant = Variant {
    wait: FieldWait::Skip,
    price: PriceSource::ContainerInput,
    storage: StorageSource::SharedCell { index: 10 },
    fee: FeeSource::IndexedCell { index: 8 },
};

const GENERIC: Variant = Variant {
    wait: FieldWait::BestEffort,
    price: PriceSource::ContainerInput,
    storage: StorageSource::TestIdPanels,
    fee: FeeSource::IndexedCell { index: 11 },
};
