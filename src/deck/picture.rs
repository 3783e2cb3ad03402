//! Picture shape (`p:pic`) construction.

use crate::xml::Element;

use super::shape::Geometry;

/// Build a `p:pic` element showing the image behind relationship `rel_id`,
/// stretched over `geometry`.
pub fn picture_element(id: u32, name: &str, description: &str, rel_id: &str, geometry: Geometry) -> Element {
    let non_visual = Element::new("p:nvPicPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", id.to_string())
                .with_attr("name", name)
                .with_attr("descr", description),
        )
        .with_child(
            Element::new("p:cNvPicPr")
                .with_child(Element::new("a:picLocks").with_attr("noChangeAspect", "1")),
        )
        .with_child(Element::new("p:nvPr"));

    let blip_fill = Element::new("p:blipFill")
        .with_child(Element::new("a:blip").with_attr("r:embed", rel_id))
        .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect")));

    let shape_properties = Element::new("p:spPr")
        .with_child(
            Element::new("a:xfrm")
                .with_child(
                    Element::new("a:off")
                        .with_attr("x", geometry.left.to_string())
                        .with_attr("y", geometry.top.to_string()),
                )
                .with_child(
                    Element::new("a:ext")
                        .with_attr("cx", geometry.width.to_string())
                        .with_attr("cy", geometry.height.to_string()),
                ),
        )
        .with_child(
            Element::new("a:prstGeom")
                .with_attr("prst", "rect")
                .with_child(Element::new("a:avLst")),
        );

    Element::new("p:pic")
        .with_child(non_visual)
        .with_child(blip_fill)
        .with_child(shape_properties)
}
