//! PresentationML package: a title slide with the project name and main
//! topic, then one title-and-content slide per section.

use super::{blocks, escape_xml, Part};
use crate::models::ProjectWithSections;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#;

// 16:9 slide in EMU
const SLIDE_CX: i64 = 12_192_000;
const SLIDE_CY: i64 = 6_858_000;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Docforge">
<a:themeElements>
<a:clrScheme name="Docforge">
<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
<a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
<a:dk2><a:srgbClr val="1F2937"/></a:dk2>
<a:lt2><a:srgbClr val="F3F4F6"/></a:lt2>
<a:accent1><a:srgbClr val="2563EB"/></a:accent1>
<a:accent2><a:srgbClr val="16A34A"/></a:accent2>
<a:accent3><a:srgbClr val="F59E0B"/></a:accent3>
<a:accent4><a:srgbClr val="DC2626"/></a:accent4>
<a:accent5><a:srgbClr val="7C3AED"/></a:accent5>
<a:accent6><a:srgbClr val="0891B2"/></a:accent6>
<a:hlink><a:srgbClr val="2563EB"/></a:hlink>
<a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink>
</a:clrScheme>
<a:fontScheme name="Docforge">
<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
</a:fontScheme>
<a:fmtScheme name="Docforge">
<a:fillStyleLst>
<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
</a:fillStyleLst>
<a:lnStyleLst>
<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
<a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
<a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
</a:lnStyleLst>
<a:effectStyleLst>
<a:effectStyle><a:effectLst/></a:effectStyle>
<a:effectStyle><a:effectLst/></a:effectStyle>
<a:effectStyle><a:effectLst/></a:effectStyle>
</a:effectStyleLst>
<a:bgFillStyleLst>
<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
</a:bgFillStyleLst>
</a:fmtScheme>
</a:themeElements>
</a:theme>"#;

/// Slide layouts referenced by the master, in relationship order.
#[derive(Clone, Copy)]
enum Layout {
    Title,
    TitleAndContent,
}

impl Layout {
    fn number(self) -> usize {
        match self {
            Self::Title => 1,
            Self::TitleAndContent => 2,
        }
    }
}

pub(super) fn parts(project: &ProjectWithSections) -> Vec<Part> {
    let slide_count = 1 + project.sections.len();

    let mut parts = vec![
        Part::new("[Content_Types].xml", content_types(slide_count)),
        Part::new("_rels/.rels", PACKAGE_RELS),
        Part::new("ppt/presentation.xml", presentation_xml(slide_count)),
        Part::new(
            "ppt/_rels/presentation.xml.rels",
            presentation_rels(slide_count),
        ),
        Part::new("ppt/slideMasters/slideMaster1.xml", master_xml()),
        Part::new(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            relationships(&[
                ("slideLayout", "../slideLayouts/slideLayout1.xml".to_string()),
                ("slideLayout", "../slideLayouts/slideLayout2.xml".to_string()),
                ("theme", "../theme/theme1.xml".to_string()),
            ]),
        ),
        Part::new("ppt/theme/theme1.xml", THEME),
    ];

    for layout in [Layout::Title, Layout::TitleAndContent] {
        let n = layout.number();
        parts.push(Part::new(
            format!("ppt/slideLayouts/slideLayout{n}.xml"),
            layout_xml(layout),
        ));
        parts.push(Part::new(
            format!("ppt/slideLayouts/_rels/slideLayout{n}.xml.rels"),
            relationships(&[("slideMaster", "../slideMasters/slideMaster1.xml".to_string())]),
        ));
    }

    let mut slides = vec![(
        Layout::Title,
        title_slide_xml(&project.project.name, &project.project.main_topic),
    )];
    for section in &project.sections {
        slides.push((
            Layout::TitleAndContent,
            content_slide_xml(&section.title, section.content.as_deref().unwrap_or("")),
        ));
    }

    for (i, (layout, xml)) in slides.into_iter().enumerate() {
        let n = i + 1;
        parts.push(Part::new(format!("ppt/slides/slide{n}.xml"), xml));
        parts.push(Part::new(
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[(
                "slideLayout",
                format!("../slideLayouts/slideLayout{}.xml", layout.number()),
            )]),
        ));
    }

    parts
}

fn content_types(slide_count: usize) -> String {
    let slides: String = (1..=slide_count)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
{slides}
</Types>"#
    )
}

fn presentation_xml(slide_count: usize) -> String {
    // rId1 is the master, rId2 the theme, slides start at rId3
    let slide_ids: String = (0..slide_count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let mut rels = vec![
        ("slideMaster", "slideMasters/slideMaster1.xml".to_string()),
        ("theme", "theme/theme1.xml".to_string()),
    ];
    for n in 1..=slide_count {
        rels.push(("slide", format!("slides/slide{n}.xml")));
    }
    relationships(&rels)
}

/// Relationship part with ids `rId1..` in the given order.
fn relationships(rels: &[(&str, String)]) -> String {
    let body: String = rels
        .iter()
        .enumerate()
        .map(|(i, (kind, target))| {
            format!(
                r#"<Relationship Id="rId{}" Type="{REL_NS}/{kind}" Target="{target}"/>"#,
                i + 1
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
    )
}

fn master_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst></p:sldMaster>"#,
        group_header()
    )
}

fn layout_xml(layout: Layout) -> String {
    let (kind, name) = match layout {
        Layout::Title => ("title", "Title Slide"),
        Layout::TitleAndContent => ("obj", "Title and Content"),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {NS} type="{kind}" preserve="1"><p:cSld name="{name}"><p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        group_header()
    )
}

fn title_slide_xml(name: &str, main_topic: &str) -> String {
    let title = text_shape(
        2,
        "Title 1",
        r#"<p:ph type="ctrTitle"/>"#,
        (914_400, 2_130_425, SLIDE_CX - 1_828_800, 1_470_025),
        4400,
        &[vec![name.to_string()]],
    );
    let subtitle = text_shape(
        3,
        "Subtitle 2",
        r#"<p:ph type="subTitle" idx="1"/>"#,
        (1_828_800, 3_886_200, SLIDE_CX - 3_657_600, 1_752_600),
        2400,
        &[vec![main_topic.to_string()]],
    );
    slide_xml(&format!("{title}{subtitle}"))
}

fn content_slide_xml(title: &str, content: &str) -> String {
    let heading = text_shape(
        2,
        "Title 1",
        r#"<p:ph type="title"/>"#,
        (609_600, 274_638, SLIDE_CX - 1_219_200, 1_143_000),
        3600,
        &[vec![title.to_string()]],
    );
    let body = text_shape(
        3,
        "Content Placeholder 2",
        r#"<p:ph idx="1"/>"#,
        (609_600, 1_600_200, SLIDE_CX - 1_219_200, SLIDE_CY - 2_057_400),
        1800,
        &blocks(content),
    );
    slide_xml(&format!("{heading}{body}"))
}

fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:spTree>{}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        group_header()
    )
}

fn group_header() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
}

/// A placeholder shape with an explicit position so it renders without
/// relying on layout inheritance. Each entry of `paragraphs` is one
/// paragraph whose lines are joined by line breaks.
fn text_shape(
    id: u32,
    name: &str,
    placeholder: &str,
    (x, y, cx, cy): (i64, i64, i64, i64),
    size: u32,
    paragraphs: &[Vec<String>],
) -> String {
    let mut body: String = paragraphs
        .iter()
        .map(|lines| {
            let runs: Vec<String> = lines
                .iter()
                .map(|line| {
                    format!(
                        r#"<a:r><a:rPr lang="en-US" sz="{size}" dirty="0"/><a:t>{}</a:t></a:r>"#,
                        escape_xml(line)
                    )
                })
                .collect();
            format!("<a:p>{}</a:p>", runs.join("<a:br/>"))
        })
        .collect();

    // A text body needs at least one paragraph
    if body.is_empty() {
        body.push_str("<a:p/>");
    }

    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{placeholder}</p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm></p:spPr><p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{body}</p:txBody></p:sp>"#
    )
}
