use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::audio::PeakingFilter;
use crate::orbit::OrbitPath;
use crate::sphere::SphereSettings;
use crate::stereo::CameraParameters;
use crate::surface::{ShapeParameters, SurfaceSampling};

/// Everything the demo needs before the first frame.
///
/// Parsed from an XML document whose sections are all optional:
///
/// ```xml
/// <demo>
///     <surface><b>6</b><m>6</m><a>4</a><n>0.5</n><phi>0</phi>
///              <zoom>1</zoom><radialStep>0.001</radialStep><angularStep>0.5</angularStep></surface>
///     <sphere><radius>0.5</radius><latSegments>500</latSegments><lonSegments>500</lonSegments></sphere>
///     <camera><eyeSeparation>0.5</eyeSeparation><fov>1.2</fov>
///             <nearClippingDistance>10</nearClippingDistance><convergenceDistance>50</convergenceDistance></camera>
///     <orbit><offsetX>0</offsetX><offsetY>0</offsetY><offsetZ>-5</offsetZ><radius>4</radius></orbit>
///     <assets><texture>texture.png</texture><audio>audio.mp3</audio></assets>
///     <filter><frequency>1000</frequency><gain>25</gain><q>1</q></filter>
/// </demo>
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    pub shape: ShapeParameters,
    pub sampling: SurfaceSampling,
    pub zoom: f64,
    pub sphere: SphereSettings,
    pub camera: CameraParameters,
    pub orbit: OrbitPath,
    pub texture_path: String,
    pub audio_path: String,
    pub filter: PeakingFilter,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            shape: ShapeParameters::default(),
            sampling: SurfaceSampling::default(),
            zoom: 1.0,
            sphere: SphereSettings::default(),
            camera: CameraParameters::default(),
            orbit: OrbitPath::default(),
            texture_path: "texture.png".to_string(),
            audio_path: "audio.mp3".to_string(),
            filter: PeakingFilter::default(),
        }
    }
}

impl DemoConfig {
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid demo XML")?;
        let root = document.root_element();
        let mut config = Self::default();

        if let Some(surface) = section(&root, "surface") {
            let shape = &mut config.shape;
            shape.b = parse_number(optional_text(&surface, "b"), shape.b)?;
            shape.m = parse_number(optional_text(&surface, "m"), shape.m)?;
            shape.a = parse_number(optional_text(&surface, "a"), shape.a)?;
            shape.n = parse_number(optional_text(&surface, "n"), shape.n)?;
            shape.phi = parse_number(optional_text(&surface, "phi"), shape.phi)?;
            config.zoom = parse_number(optional_text(&surface, "zoom"), config.zoom)?;
            let sampling = &mut config.sampling;
            sampling.radial_step =
                parse_number(optional_text(&surface, "radialStep"), sampling.radial_step)?;
            sampling.angular_step =
                parse_number(optional_text(&surface, "angularStep"), sampling.angular_step)?;
        }

        if let Some(sphere) = section(&root, "sphere") {
            let settings = &mut config.sphere;
            settings.radius = parse_number(optional_text(&sphere, "radius"), settings.radius)?;
            settings.lat_segments =
                parse_number(optional_text(&sphere, "latSegments"), settings.lat_segments)?;
            settings.lon_segments =
                parse_number(optional_text(&sphere, "lonSegments"), settings.lon_segments)?;
        }

        if let Some(camera) = section(&root, "camera") {
            let params = &mut config.camera;
            params.eye_separation =
                parse_number(optional_text(&camera, "eyeSeparation"), params.eye_separation)?;
            params.fov = parse_number(optional_text(&camera, "fov"), params.fov)?;
            params.near_clipping_distance = parse_number(
                optional_text(&camera, "nearClippingDistance"),
                params.near_clipping_distance,
            )?;
            params.convergence_distance = parse_number(
                optional_text(&camera, "convergenceDistance"),
                params.convergence_distance,
            )?;
        }

        if let Some(orbit) = section(&root, "orbit") {
            let path = &mut config.orbit;
            path.offset_x = parse_number(optional_text(&orbit, "offsetX"), path.offset_x)?;
            path.offset_y = parse_number(optional_text(&orbit, "offsetY"), path.offset_y)?;
            path.offset_z = parse_number(optional_text(&orbit, "offsetZ"), path.offset_z)?;
            path.radius = parse_number(optional_text(&orbit, "radius"), path.radius)?;
        }

        if let Some(assets) = section(&root, "assets") {
            if let Some(texture) = optional_text(&assets, "texture") {
                config.texture_path = texture;
            }
            if let Some(audio) = optional_text(&assets, "audio") {
                config.audio_path = audio;
            }
        }

        if let Some(filter) = section(&root, "filter") {
            let peaking = &mut config.filter;
            peaking.frequency = parse_number(optional_text(&filter, "frequency"), peaking.frequency)?;
            peaking.gain = parse_number(optional_text(&filter, "gain"), peaking.gain)?;
            peaking.q = parse_number(optional_text(&filter, "q"), peaking.q)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make the meshes or projections undefined.
    pub fn validate(&self) -> Result<()> {
        if !(self.shape.b > 0.0) {
            bail!("surface radius b must be positive, got {}", self.shape.b);
        }
        if self.zoom == 0.0 || !self.zoom.is_finite() {
            bail!("zoom must be a non-zero number, got {}", self.zoom);
        }
        if !(self.sampling.radial_step > 0.0 && self.sampling.angular_step > 0.0) {
            bail!(
                "sampling steps must be positive, got {} and {}",
                self.sampling.radial_step,
                self.sampling.angular_step
            );
        }
        if self.sphere.lat_segments == 0 || self.sphere.lon_segments == 0 {
            bail!("sphere needs at least one latitude and longitude segment");
        }
        if !self.camera.is_valid() {
            bail!("camera parameters out of range: {:?}", self.camera);
        }
        Ok(())
    }
}

fn section<'a, 'input>(root: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    root.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_number<T>(value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .parse::<T>()
            .map_err(|err| anyhow!("failed to parse number {value:?}: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DemoConfig::from_xml("<demo/>").unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.shape.b, 6.0);
        assert_eq!(config.sampling.radial_step, 0.001);
        assert_eq!(config.sphere.lat_segments, 500);
        assert_eq!(config.texture_path, "texture.png");
        assert_eq!(config.audio_path, "audio.mp3");
    }

    #[test]
    fn sections_override_defaults() {
        let config = DemoConfig::from_xml(
            r#"
            <demo>
                <surface>
                    <b>3</b>
                    <phi>1.5</phi>
                    <zoom>2</zoom>
                    <radialStep>0.25</radialStep>
                </surface>
                <sphere><latSegments>8</latSegments></sphere>
                <camera><eyeSeparation>0.2</eyeSeparation></camera>
                <orbit><radius>2</radius></orbit>
                <assets><texture> stripes.png </texture></assets>
                <filter><gain>12</gain></filter>
            </demo>
            "#,
        )
        .unwrap();
        assert_eq!(config.shape.b, 3.0);
        assert_eq!(config.shape.m, 6.0);
        assert_eq!(config.shape.phi, 1.5);
        assert_eq!(config.zoom, 2.0);
        assert_eq!(config.sampling.radial_step, 0.25);
        assert_eq!(config.sampling.angular_step, 0.5);
        assert_eq!(config.sphere.lat_segments, 8);
        assert_eq!(config.sphere.lon_segments, 500);
        assert_eq!(config.camera.eye_separation, 0.2);
        assert_eq!(config.camera.fov, 1.2);
        assert_eq!(config.orbit.radius, 2.0);
        assert_eq!(config.orbit.offset_z, -5.0);
        assert_eq!(config.texture_path, "stripes.png");
        assert_eq!(config.filter.gain, 12.0);
        assert_eq!(config.filter.frequency, 1000.0);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = DemoConfig::from_xml("<demo><surface><b>six</b></surface></demo>").unwrap_err();
        assert!(err.to_string().contains("six"));
        assert!(DemoConfig::from_xml("<demo><sphere><latSegments>-1</latSegments></sphere></demo>").is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(DemoConfig::from_xml("<demo><surface><b>0</b></surface></demo>").is_err());
        assert!(DemoConfig::from_xml("<demo><surface><zoom>0</zoom></surface></demo>").is_err());
        assert!(DemoConfig::from_xml("<demo><surface><angularStep>0</angularStep></surface></demo>").is_err());
        assert!(DemoConfig::from_xml("<demo><camera><fov>4</fov></camera></demo>").is_err());
        assert!(DemoConfig::from_xml("<demo><camera><convergenceDistance>0</convergenceDistance></camera></demo>").is_err());
    }

    #[test]
    fn broken_xml_is_reported() {
        let err = DemoConfig::from_xml("<demo>").unwrap_err();
        assert!(err.to_string().contains("invalid demo XML"));
    }
}
