mod action;
mod enrichment;
mod external;
mod filter;
mod transform;

pub use action::{ActionConfig, ActionNode};
pub use enrichment::{EnrichmentConfig, EnrichmentNode, ENRICHMENT_FIELD};
pub use external::{ExternalConfig, ExternalNode};
pub use filter::{FilterConfig, FilterNode};
pub use transform::{TransformConfig, TransformNode};
