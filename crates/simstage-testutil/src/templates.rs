//! Markup for fixture files.

/// A `package.xml` manifest.
pub fn package_xml(name: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<package format="2">
  <name>{name}</name>
  <version>0.0.1</version>
  <description>{name} fixture</description>
  <maintainer email="dev@example.com">dev</maintainer>
  <license>MIT</license>
</package>
"#
    )
}

/// A robot descriptor. Each reference ending in `.xacro` becomes an
/// `xacro:include`, anything else a visual mesh. Each plugin becomes a
/// `gazebo/plugin` element.
pub fn robot(references: &[&str], plugins: &[&str]) -> String {
    let mut body = String::new();
    for (i, reference) in references.iter().enumerate() {
        if reference.ends_with(".xacro") {
            body.push_str(&format!("  <xacro:include filename=\"{reference}\"/>\n"));
        } else {
            body.push_str(&format!(
                "  <link name=\"link_{i}\">\n    <visual><geometry><mesh filename=\"{reference}\"/></geometry></visual>\n  </link>\n"
            ));
        }
    }
    for (i, plugin) in plugins.iter().enumerate() {
        body.push_str(&format!(
            "  <gazebo>\n    <plugin name=\"plugin_{i}\" filename=\"{plugin}\"/>\n  </gazebo>\n"
        ));
    }
    format!(
        "<?xml version=\"1.0\"?>\n<robot name=\"robot\" xmlns:xacro=\"http://www.ros.org/wiki/xacro\">\n{body}</robot>\n"
    )
}

/// A world including each named model.
pub fn world(models: &[&str]) -> String {
    let includes: String = models
        .iter()
        .map(|m| format!("    <include>\n      <uri>model://{m}</uri>\n    </include>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\"?>\n<sdf version=\"1.6\">\n  <world name=\"default\">\n{includes}  </world>\n</sdf>\n"
    )
}

/// A `model.sdf`. `materials` is the text of a `materials` element;
/// `Some("")` renders an empty one, `None` leaves it out.
pub fn model_sdf(name: &str, materials: Option<&str>) -> String {
    let materials = match materials {
        Some(text) => format!("        <materials>{text}</materials>\n"),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0"?>
<sdf version="1.6">
  <model name="{name}">
    <link name="link">
      <visual name="visual">
        <geometry><mesh><uri>model://{name}/meshes/{name}.dae</uri></mesh></geometry>
{materials}      </visual>
    </link>
  </model>
</sdf>
"#
    )
}

/// A launch file loading each descriptor reference through xacro.
pub fn launch(references: &[&str]) -> String {
    let params: String = references
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "  <param name=\"robot_description_{i}\" command=\"$(find xacro)/xacro {r}\"/>\n"
            )
        })
        .collect();
    format!("<launch>\n{params}</launch>\n")
}

/// A COLLADA mesh with one image per texture path.
pub fn collada(textures: &[&str]) -> String {
    let images: String = textures
        .iter()
        .enumerate()
        .map(|(i, t)| format!("    <image id=\"img_{i}\"><init_from>{t}</init_from></image>\n"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <library_images>
{images}  </library_images>
</COLLADA>
"#
    )
}
