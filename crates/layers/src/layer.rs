/// Map-library layer (and source) identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub &'static str);

impl LayerId {
    pub const ROUTE_OUTLINE: LayerId = LayerId("routes-outline");
    pub const ROUTE_LINE: LayerId = LayerId("routes-line");
    pub const HIGHLIGHT: LayerId = LayerId("highlight-segment");
    pub const ISO_POLYGONS: LayerId = LayerId("isochrones-fill");
    pub const ISO_POINTS: LayerId = LayerId("isochrones-locations");
    pub const HEIGHTGRAPH_HOVER: LayerId = LayerId("heightgraph-hover");

    pub fn as_str(self) -> &'static str {
        self.0
    }
}

/// Something drawn into one map layer.
pub trait Layer {
    fn id(&self) -> LayerId;
}
