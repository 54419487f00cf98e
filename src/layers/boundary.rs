use std::any::Any;

use log::debug;

use crate::{
    core::{config::BoundaryOptions, geo::Point, projection},
    data::geojson::{GeoJson, GeoJsonFeature},
    layers::base::{Capabilities, Element, ElementContext, ElementProperties, ElementType},
    scene::{NodeId, NodeKind, PathStyle, SceneGraph},
    MapError, Result,
};

/// Base z of boundary paths; the per-feature style z is added on top
const BOUNDARY_Z: i32 = 10;

/// Per-feature overrides returned by a style function. Unset fields keep
/// the layer defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryStyle {
    pub color: Option<String>,
    pub z: Option<i32>,
}

pub type StyleFn = Box<dyn Fn(&GeoJsonFeature) -> BoundaryStyle>;

/// One feature drawn as a compound path of projected rings
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPath {
    pub name: String,
    pub paths: Vec<Vec<Point>>,
    pub style: PathStyle,
    pub z: i32,
    /// Scene node, once mounted
    pub node: Option<NodeId>,
}

/// Polygon outlines from a GeoJSON feature collection, shown within a zoom range
pub struct BoundaryLayer {
    properties: ElementProperties,
    options: BoundaryOptions,
    style: Option<StyleFn>,
    features: Vec<BoundaryPath>,
    paths_visible: bool,
}

impl BoundaryLayer {
    pub fn new(name: impl Into<String>, options: BoundaryOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            properties: ElementProperties::new(name, ElementType::Boundary),
            options,
            style: None,
            features: Vec::new(),
            paths_visible: true,
        })
    }

    /// Sets the per-feature style function. Applies to data set afterwards.
    pub fn with_style<F>(mut self, style: F) -> Self
    where
        F: Fn(&GeoJsonFeature) -> BoundaryStyle + 'static,
    {
        self.style = Some(Box::new(style));
        self
    }

    /// Loads data before the layer is attached
    pub fn with_data(mut self, geo: &GeoJson) -> Result<Self> {
        self.features = self.build(geo)?;
        Ok(self)
    }

    pub fn options(&self) -> &BoundaryOptions {
        &self.options
    }

    /// Replaces the drawn features. On error the current paths are kept.
    pub fn set_data(&mut self, geo: &GeoJson, ctx: &mut ElementContext<'_>) -> Result<()> {
        let features = self.build(geo)?;
        for node in self.features.iter().filter_map(|f| f.node) {
            ctx.scene.remove_node(node);
        }
        self.features = features;
        if self.properties.root.is_some() {
            self.mount(ctx.scene);
            self.apply_visibility(ctx.viewport.zoom(), ctx.scene);
        }
        Ok(())
    }

    /// Feature names in data order
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn path(&self, name: &str) -> Option<&BoundaryPath> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Whether the paths are shown at the last zoom seen
    pub fn paths_visible(&self) -> bool {
        self.paths_visible
    }

    fn build(&self, geo: &GeoJson) -> Result<Vec<BoundaryPath>> {
        let GeoJson::FeatureCollection { features } = geo else {
            return Err(MapError::UnsupportedGeometry(format!(
                "expected a FeatureCollection, got {}",
                geo.type_name()
            )));
        };

        let mut out: Vec<BoundaryPath> = Vec::with_capacity(features.len());
        for (i, feature) in features.iter().enumerate() {
            let path = self.build_feature(i, feature)?;
            // Later features replace earlier ones of the same name
            match out.iter_mut().find(|p| p.name == path.name) {
                Some(existing) => *existing = path,
                None => out.push(path),
            }
        }
        Ok(out)
    }

    fn build_feature(&self, index: usize, feature: &GeoJsonFeature) -> Result<BoundaryPath> {
        let name = feature
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("feature-{index}"));
        let geometry = feature.geometry.as_ref().ok_or_else(|| {
            MapError::UnsupportedGeometry(format!("feature '{name}' has no geometry"))
        })?;
        let rings = geometry.rings().ok_or_else(|| {
            MapError::UnsupportedGeometry(format!(
                "feature '{name}' is a {}",
                geometry.type_name()
            ))
        })?;

        let paths = rings
            .into_iter()
            .map(|ring| {
                ring.iter()
                    .map(|[lon, lat]| {
                        Point::new(projection::lon_to_x(*lon), projection::lat_to_y(*lat))
                    })
                    .collect()
            })
            .collect();

        let overrides = self
            .style
            .as_ref()
            .map(|style| style(feature))
            .unwrap_or_default();
        Ok(BoundaryPath {
            name,
            paths,
            style: PathStyle {
                stroke: overrides
                    .color
                    .unwrap_or_else(|| self.options.line_color.clone()),
                line_width: self.options.line_width,
                stroke_no_scale: true,
            },
            z: BOUNDARY_Z + overrides.z.unwrap_or(0),
            node: None,
        })
    }

    /// Creates the nodes of paths that have none yet
    fn mount(&mut self, scene: &mut dyn SceneGraph) {
        let Some(root) = self.properties.root else {
            return;
        };
        let mut mounted = 0;
        for feature in self.features.iter_mut().filter(|f| f.node.is_none()) {
            feature.node = Some(scene.add_node(
                Some(root),
                NodeKind::Path {
                    paths: feature.paths.clone(),
                    style: feature.style.clone(),
                    z: feature.z,
                },
            ));
            mounted += 1;
        }
        if mounted > 0 {
            debug!(
                "boundary '{}': mounted {} paths",
                self.properties.name, mounted
            );
        }
    }

    fn apply_visibility(&mut self, zoom: f64, scene: &mut dyn SceneGraph) {
        self.paths_visible = self.options.is_visible_at(zoom);
        for node in self.features.iter().filter_map(|f| f.node) {
            scene.set_visible(node, self.paths_visible);
        }
    }
}

impl Element for BoundaryLayer {
    fn properties(&self) -> &ElementProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut ElementProperties {
        &mut self.properties
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ON_ZOOM_END
    }

    fn on_zoom_end(&mut self, ctx: &mut ElementContext<'_>) {
        self.mount(ctx.scene);
        self.apply_visibility(ctx.viewport.zoom(), ctx.scene);
    }

    fn reset(&mut self) {
        for feature in &mut self.features {
            feature.node = None;
        }
        self.paths_visible = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
