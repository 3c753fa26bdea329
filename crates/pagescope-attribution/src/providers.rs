//! Known third-party providers, matched by longest domain suffix

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

static BUILTIN: OnceLock<ProviderDirectory> = OnceLock::new();

/// Provider taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderCategory {
    Advertising,
    Analytics,
    Cdn,
    Fonts,
    Social,
    TagManager,
    Video,
    Payments,
    CustomerSupport,
    Monitoring,
}

impl ProviderCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderCategory::Advertising => "Advertising",
            ProviderCategory::Analytics => "Analytics",
            ProviderCategory::Cdn => "CDN",
            ProviderCategory::Fonts => "Fonts",
            ProviderCategory::Social => "Social",
            ProviderCategory::TagManager => "Tag Manager",
            ProviderCategory::Video => "Video",
            ProviderCategory::Payments => "Payments",
            ProviderCategory::CustomerSupport => "Customer Support",
            ProviderCategory::Monitoring => "Monitoring",
        }
    }
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recognized provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub category: ProviderCategory,
    pub description: String,
}

impl Provider {
    pub fn new(name: &str, category: ProviderCategory, description: &str) -> Self {
        Self {
            name: name.to_string(),
            category,
            description: description.to_string(),
        }
    }
}

use ProviderCategory::*;

static KNOWN_PROVIDERS: &[(&str, &str, ProviderCategory, &str)] = &[
    ("doubleclick.net", "Google Ads", Advertising, "Display ad serving and measurement"),
    ("googlesyndication.com", "Google AdSense", Advertising, "Contextual ad network"),
    ("googleadservices.com", "Google Ads", Advertising, "Conversion tracking for search ads"),
    ("adnxs.com", "Xandr", Advertising, "Programmatic ad exchange"),
    ("criteo.com", "Criteo", Advertising, "Retargeting ads"),
    ("amazon-adsystem.com", "Amazon Ads", Advertising, "Amazon advertising platform"),
    ("taboola.com", "Taboola", Advertising, "Content recommendation ads"),
    ("outbrain.com", "Outbrain", Advertising, "Content recommendation ads"),
    ("google-analytics.com", "Google Analytics", Analytics, "Web analytics"),
    ("analytics.google.com", "Google Analytics", Analytics, "Web analytics"),
    ("hotjar.com", "Hotjar", Analytics, "Heatmaps and session recording"),
    ("segment.com", "Segment", Analytics, "Customer data pipeline"),
    ("segment.io", "Segment", Analytics, "Customer data pipeline"),
    ("mixpanel.com", "Mixpanel", Analytics, "Product analytics"),
    ("amplitude.com", "Amplitude", Analytics, "Product analytics"),
    ("clarity.ms", "Microsoft Clarity", Analytics, "Session recording and heatmaps"),
    ("googletagmanager.com", "Google Tag Manager", TagManager, "Tag management"),
    ("tiqcdn.com", "Tealium", TagManager, "Tag management"),
    ("cloudflare.com", "Cloudflare", Cdn, "CDN and edge network"),
    ("cdnjs.cloudflare.com", "cdnjs", Cdn, "Public library CDN"),
    ("jsdelivr.net", "jsDelivr", Cdn, "Public library CDN"),
    ("unpkg.com", "unpkg", Cdn, "npm package CDN"),
    ("cloudfront.net", "Amazon CloudFront", Cdn, "AWS content delivery"),
    ("akamaihd.net", "Akamai", Cdn, "Content delivery network"),
    ("fastly.net", "Fastly", Cdn, "Edge cloud CDN"),
    ("fonts.googleapis.com", "Google Fonts", Fonts, "Web font stylesheets"),
    ("fonts.gstatic.com", "Google Fonts", Fonts, "Web font files"),
    ("use.typekit.net", "Adobe Fonts", Fonts, "Web font hosting"),
    ("connect.facebook.net", "Facebook SDK", Social, "Social plugins and pixel"),
    ("facebook.com", "Facebook", Social, "Social network"),
    ("platform.twitter.com", "Twitter", Social, "Embedded tweets and buttons"),
    ("linkedin.com", "LinkedIn", Social, "Insight tag and social plugins"),
    ("youtube.com", "YouTube", Video, "Embedded video"),
    ("ytimg.com", "YouTube", Video, "Video thumbnails and player assets"),
    ("vimeo.com", "Vimeo", Video, "Embedded video"),
    ("js.stripe.com", "Stripe", Payments, "Payment elements"),
    ("paypal.com", "PayPal", Payments, "Checkout buttons"),
    ("intercom.io", "Intercom", CustomerSupport, "Chat widget"),
    ("zdassets.com", "Zendesk", CustomerSupport, "Support widget"),
    ("sentry.io", "Sentry", Monitoring, "Error monitoring"),
    ("nr-data.net", "New Relic", Monitoring, "Browser monitoring"),
];

/// Domain-suffix -> provider table
#[derive(Debug, Clone, Default)]
pub struct ProviderDirectory {
    entries: HashMap<String, Provider>,
}

impl ProviderDirectory {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared directory built from the known-provider table on first use
    pub fn builtin() -> &'static ProviderDirectory {
        BUILTIN.get_or_init(|| {
            let mut directory = ProviderDirectory::new();
            for (domain, name, category, description) in KNOWN_PROVIDERS {
                directory.insert(domain, Provider::new(name, *category, description));
            }
            directory
        })
    }

    /// Add or replace an entry keyed by domain suffix
    pub fn insert(&mut self, domain: &str, provider: Provider) {
        self.entries
            .insert(domain.trim_start_matches('.').to_ascii_lowercase(), provider);
    }

    /// Longest matching suffix on label boundaries
    pub fn lookup(&self, host: &str) -> Option<&Provider> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if let Some(provider) = self.entries.get(candidate) {
                return Some(provider);
            }
            match candidate.split_once('.') {
                Some((_, rest)) if !rest.is_empty() => candidate = rest,
                _ => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
