//! Generation of the simulation kernel's GLSL source
//!
//! The kernel is the template in `kernel.comp`. Each coefficient's mask
//! declares the inputs that it reads from the parameters uniform block, and
//! its evaluation expression is spliced in at the coefficient's use-site.
//! Solid coefficients only read the maximum of their value range, other masks
//! read both ends.

use crate::template::{Bindings, Template, TemplateError};
use data::{
    coefficients::{CoefficientName, MaskLayout, CHANGE_RETENTION, STENCIL},
    edge::EdgeMode,
    mask::{Mask, HARD_CIRCLE_RADIUS2},
};
use std::fmt::Write;

/// Kernel template
const TEMPLATE: &str = include_str!("kernel.comp");

/// GLSL declaration of the inputs that a coefficient's mask reads
fn declaration(name: CoefficientName, mask: &Mask) -> String {
    let id = name.identifier();
    match mask {
        Mask::Solid => format!("    float {id}_max = params.{id}.y;"),
        Mask::LinearGradient(_) | Mask::HardCircle | Mask::SmoothCircle => {
            format!("    vec2 {id}_range = params.{id};")
        }
    }
}

/// GLSL expression that evaluates a coefficient at position `pos`
fn evaluation(name: CoefficientName, mask: &Mask) -> String {
    let id = name.identifier();
    let factor = match mask {
        Mask::Solid => return format!("{id}_max"),
        Mask::LinearGradient(gradient) => {
            let [ux, uy] = gradient.direction();
            format!("clamp(0.5 + dot(pos - 0.5, vec2({ux:?}, {uy:?})), 0.0, 1.0)")
        }
        Mask::HardCircle => {
            format!("step({HARD_CIRCLE_RADIUS2:?}, dot(pos - 0.5, pos - 0.5))")
        }
        Mask::SmoothCircle => "clamp(1.0 - length(2.0 * (pos - 0.5)), 0.0, 1.0)".to_owned(),
    };
    format!("mix({id}_range.x, {id}_range.y, {factor})")
}

/// Generate the kernel source for some mask layout and work-group shape
pub fn generate(masks: MaskLayout, [width, height]: [u32; 2]) -> Result<String, TemplateError> {
    let template = Template::parse(TEMPLATE)?;

    let mut bindings = Bindings::new();
    bindings.bind("WORK_GROUP_WIDTH", width.to_string())?;
    bindings.bind("WORK_GROUP_HEIGHT", height.to_string())?;
    bindings.bind("EDGE_REPEAT", EdgeMode::Repeat.code().to_string())?;
    bindings.bind("CHANGE_RETENTION", format!("{CHANGE_RETENTION:?}"))?;
    let mut weights = Vec::new();
    for row in STENCIL {
        let mut weights_row = String::from("float[3](");
        for (idx, weight) in row.into_iter().enumerate() {
            let separator = if idx == 0 { "" } else { ", " };
            write!(weights_row, "{separator}{weight:?}").expect("Writing to a String can't fail");
        }
        weights_row.push(')');
        weights.push(weights_row);
    }
    bindings.bind("STENCIL_WEIGHTS", weights.join(", "))?;

    let declarations = CoefficientName::ALL
        .into_iter()
        .zip(&masks)
        .map(|(name, mask)| declaration(name, mask))
        .collect::<Vec<_>>();
    bindings.bind("COEFFICIENT_DECLARATIONS", declarations.join("\n"))?;
    for (name, mask) in CoefficientName::ALL.into_iter().zip(&masks) {
        bindings.bind(name.identifier(), evaluation(name, mask))?;
    }

    template.render(&bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::coefficients::Coefficients;

    fn all_masked() -> Coefficients {
        let mut coefficients = Coefficients::default();
        for (name, mask) in CoefficientName::ALL
            .into_iter()
            .zip(Mask::palette().into_iter().skip(2))
        {
            coefficients.set_mask(name, mask);
            coefficients.set_range(name, 0.25, 0.75);
        }
        coefficients
    }

    #[test]
    fn every_placeholder_is_resolved() {
        for coefficients in [Coefficients::default(), all_masked()] {
            let source = generate(coefficients.masks(), [8, 4]).unwrap();
            assert!(!source.contains("${"));
            assert!(source.contains("local_size_x = 8, local_size_y = 4"));
            for name in CoefficientName::ALL {
                assert!(source.contains(&format!("float {} = ", name.identifier())));
            }
        }
    }

    #[test]
    fn mask_expressions() {
        let source = generate(all_masked().masks(), [8, 8]).unwrap();
        assert!(source.contains("vec2 diffusion_rate_a_range = params.diffusion_rate_a;"));
        assert!(source.contains("step(0.245, dot(pos - 0.5, pos - 0.5))"));
        assert!(source.contains("length(2.0 * (pos - 0.5))"));
        assert!(source.contains("float diffusion_rate_a = mix(diffusion_rate_a_range.x"));

        let solid = generate(Coefficients::default().masks(), [8, 8]).unwrap();
        assert!(solid.contains("float feed_rate_max = params.feed_rate.y;"));
        assert!(solid.contains("float feed_rate = feed_rate_max;"));
        assert!(!solid.contains("_range"));
    }
}
