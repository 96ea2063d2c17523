// crates/dashboard/src/catalog.rs
//! Static catalog of dashboard pages and the charts they mount.
//!
//! Plot order within a page is the order of the checkboxes in the widget
//! registry, so it must not depend on anything but this table.

use bbdash_core::PlotSlug;
use serde::Serialize;

use ChartKind::{Activity, Categorical, DurationDistribution, IntDistribution, Network, SizeHistogram};

/// How a chart's data is shaped, which decides the bucketing flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Count per entity, log-scaled integer buckets.
    IntDistribution,
    /// Time span per entity, calendar duration buckets.
    DurationDistribution,
    /// Counts per enum value or per client.
    Categorical,
    /// Weekday × hour heatmap of creation timestamps.
    Activity,
    /// Content sizes in bytes.
    SizeHistogram,
    /// Relationship network, rendered outside of the chart pipeline.
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlotSpec {
    pub slug: &'static str,
    pub title: &'static str,
    pub kind: ChartKind,
    /// Value 0 encodes "no limit" and is labeled `Unlimited`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub zero_means_unlimited: bool,
}

impl PlotSpec {
    const fn new(slug: &'static str, title: &'static str, kind: ChartKind) -> Self {
        Self {
            slug,
            title,
            kind,
            zero_means_unlimited: false,
        }
    }

    const fn unlimited_zero(self) -> Self {
        Self {
            zero_means_unlimited: true,
            ..self
        }
    }

    pub fn plot_slug(&self) -> PlotSlug {
        PlotSlug::new(self.slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub name: &'static str,
    pub path: &'static str,
    pub plots: &'static [PlotSpec],
}

impl Page {
    /// Checkbox identifiers in mount order.
    pub fn slugs(&self) -> impl Iterator<Item = PlotSlug> + '_ {
        self.plots.iter().map(PlotSpec::plot_slug)
    }

    pub fn plot(&self, slug: &str) -> Option<&'static PlotSpec> {
        self.plots.iter().find(|p| p.slug == slug)
    }
}

static PAGES: &[Page] = &[
    Page {
        name: "Identities",
        path: "/identities",
        plots: &[
            PlotSpec::new("num-identities-per-client", "Number of Identities per Backbone Client", Categorical),
            PlotSpec::new("activity-identity-creations", "Number of Identity Creations per Day", Activity),
        ],
    },
    Page {
        name: "Devices",
        path: "/devices",
        plots: &[
            PlotSpec::new("num-devices-per-identity", "Number of Devices per Identity", IntDistribution),
            PlotSpec::new("device-type-distribution", "Device Push Channel Type (PNS Prefix)", Categorical),
        ],
    },
    Page {
        name: "Messages",
        path: "/messages",
        plots: &[
            PlotSpec::new("num-sent-messages-per-client", "Number of Sent Messages per Backbone Client", Categorical),
            PlotSpec::new(
                "num-received-messages-per-client",
                "Number of Received Messages per Backbone Client",
                Categorical,
            ),
            PlotSpec::new(
                "num-recipients-per-sender-client-type",
                "Number of Recipients of Sent Messages",
                IntDistribution,
            ),
            PlotSpec::new("message-content-size", "Size of Message Content", SizeHistogram),
            PlotSpec::new("activity-num-sent-messages", "Messages Sent over time", Activity),
        ],
    },
    Page {
        name: "Relationships",
        path: "/relationships",
        plots: &[
            PlotSpec::new("forcegraph", "Relationship Network", Network),
            PlotSpec::new("relationship-status-distribution", "Relationship Status Distribution", Categorical),
            PlotSpec::new(
                "relationship-duration-pending",
                "Duration of Relationships in 'Pending' State",
                DurationDistribution,
            ),
            PlotSpec::new(
                "num-peers-per-identity",
                "Distribution of Number of Peers per Identity",
                IntDistribution,
            ),
            PlotSpec::new("ral-reasons", "Distribution of Relationship Audit Log Reasons", Categorical),
        ],
    },
    Page {
        name: "Relationship Templates",
        path: "/relationship-templates",
        plots: &[
            PlotSpec::new("size-of-relationship-templates", "Size of Relationship Templates", SizeHistogram),
            PlotSpec::new(
                "num-relationship-templates-per-identity",
                "Distribution of Number of Relationship Templates Created per Identity",
                IntDistribution,
            ),
            PlotSpec::new(
                "num-max-rel-templ-allocations",
                "Max. Number of Relationship Template Allocations",
                IntDistribution,
            )
            .unlimited_zero(),
            PlotSpec::new(
                "rlt-time-until-first-usage",
                "Time until first usage of Relationship Template",
                DurationDistribution,
            ),
            PlotSpec::new("rlt-validity-period", "Validity Period of Relationship Templates", DurationDistribution),
        ],
    },
    Page {
        name: "Tokens",
        path: "/tokens",
        plots: &[
            PlotSpec::new(
                "num-tokens-per-identity",
                "Distribution of Number of Tokens per Identity",
                IntDistribution,
            ),
            PlotSpec::new("token-size", "Distribution of Token Size", SizeHistogram),
        ],
    },
    Page {
        name: "Files",
        path: "/files",
        plots: &[
            PlotSpec::new("num-files-per-identity", "Number of Files per Identity", IntDistribution),
            PlotSpec::new("size-of-file-contents", "Size of File Content", SizeHistogram),
            PlotSpec::new("activity-num-created-files", "Number of File Creations per Day", Activity),
        ],
    },
    Page {
        name: "Datawallet Modifications",
        path: "/datawallet-modifications",
        plots: &[
            PlotSpec::new(
                "num-datawallet-modifications",
                "Distribution of Number of Datawallet Modifications per Identity",
                IntDistribution,
            ),
            PlotSpec::new(
                "size-of-datawallet-modifications",
                "Distribution of Size of Datawallet Modifications",
                SizeHistogram,
            ),
            PlotSpec::new(
                "type-of-datawallet-modifications",
                "Distribution of Type of Datawallet Modifications",
                Categorical,
            ),
            PlotSpec::new(
                "collection-of-datawallet-modifications",
                "Distribution of Collection of Datawallet Modifications",
                Categorical,
            ),
            PlotSpec::new(
                "payload-category-of-datawallet-modifications",
                "Distribution of Payload Category of Datawallet Modifications",
                Categorical,
            ),
        ],
    },
    Page {
        name: "Synchronization",
        path: "/synchronization",
        plots: &[
            PlotSpec::new("sync-errors", "Synchronization Errors over Time", Activity),
            PlotSpec::new("type-of-external-events", "External Event Types", Categorical),
            PlotSpec::new(
                "num-external-events-per-sync-run",
                "Distribution of the number of External Events Per Sync Run",
                IntDistribution,
            ),
            PlotSpec::new("activity-external-events", "Sync runs over time", Activity),
        ],
    },
];

/// All pages in navigation order.
pub fn pages() -> &'static [Page] {
    PAGES
}

/// The page `/` redirects to.
pub fn landing_page() -> &'static Page {
    &PAGES[0]
}

/// Page served at `path`. The root path serves the landing page.
pub fn page(path: &str) -> Option<&'static Page> {
    if path == "/" {
        return Some(landing_page());
    }
    PAGES.iter().find(|p| p.path == path)
}

/// Look up a plot anywhere in the catalog.
pub fn plot(slug: &str) -> Option<(&'static Page, &'static PlotSpec)> {
    PAGES
        .iter()
        .find_map(|page| page.plot(slug).map(|plot| (page, plot)))
}
