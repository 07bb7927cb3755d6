//! Office Open XML (.pptx) writer
//!
//! Writes the minimum package PowerPoint, Keynote and LibreOffice accept:
//! one master, one blank layout, one theme, and one slide part per slide.
//! Every slide is drawn with absolutely positioned shapes on a 16:9 canvas.

use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::outline::OutlineSlide;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// English Metric Units per inch
const EMU: i64 = 914_400;
const SLIDE_W: i64 = 12_192_000;
const SLIDE_H: i64 = 6_858_000;

const HDI_GREEN: &str = "10B981";
const BG: &str = "212121";
const BG_DARK: &str = "171717";
const WHITE: &str = "FFFFFF";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_OFFICE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn inches(v: f64) -> i64 {
    (v * EMU as f64).round() as i64
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

struct Para<'a> {
    text: &'a str,
    size_pt: u32,
    bold: bool,
    color: &'a str,
    centered: bool,
    space_after_pt: u32,
}

impl<'a> Para<'a> {
    fn new(text: &'a str, size_pt: u32, color: &'a str) -> Self {
        Self {
            text,
            size_pt,
            bold: false,
            color,
            centered: false,
            space_after_pt: 0,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    fn space_after(mut self, pt: u32) -> Self {
        self.space_after_pt = pt;
        self
    }

    fn to_xml(&self) -> String {
        let mut ppr = String::new();
        if self.centered || self.space_after_pt > 0 {
            let algn = if self.centered { r#" algn="ctr""# } else { "" };
            if self.space_after_pt > 0 {
                ppr = format!(
                    r#"<a:pPr{algn}><a:spcAft><a:spcPts val="{}"/></a:spcAft></a:pPr>"#,
                    self.space_after_pt * 100
                );
            } else {
                ppr = format!("<a:pPr{algn}/>");
            }
        }
        format!(
            r#"<a:p>{ppr}<a:r><a:rPr lang="id-ID" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
            self.size_pt * 100,
            if self.bold { 1 } else { 0 },
            self.color,
            escape(self.text)
        )
    }
}

/// Accumulates the shape tree of one slide
struct SlideCanvas {
    shapes: Vec<String>,
    next_id: u32,
}

impl SlideCanvas {
    fn new(background: &str) -> Self {
        let mut canvas = Self {
            shapes: Vec::new(),
            next_id: 2,
        };
        canvas.rect("rect", 0, 0, SLIDE_W, SLIDE_H, background);
        canvas
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn xfrm(x: i64, y: i64, cx: i64, cy: i64) -> String {
        format!(r#"<a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#)
    }

    fn rect(&mut self, prst: &str, x: i64, y: i64, cx: i64, cy: i64, fill: &str) {
        let id = self.id();
        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="{prst}"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="{fill}"/></a:solidFill><a:ln><a:noFill/></a:ln></p:spPr></p:sp>"#,
            Self::xfrm(x, y, cx, cy)
        ));
    }

    fn text(&mut self, x: i64, y: i64, cx: i64, cy: i64, paras: &[Para<'_>]) {
        let id = self.id();
        let body: String = paras.iter().map(Para::to_xml).collect();
        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"/><a:lstStyle/>{body}</p:txBody></p:sp>"#,
            Self::xfrm(x, y, cx, cy)
        ));
    }

    fn into_xml(self) -> String {
        format!(
            r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            self.shapes.concat()
        )
    }
}

fn title_slide(title: &str) -> String {
    let mut c = SlideCanvas::new(BG);
    c.rect("roundRect", inches(5.9), inches(1.5), inches(1.5), inches(1.5), HDI_GREEN);
    c.text(
        inches(5.9),
        inches(1.7),
        inches(1.5),
        inches(1.1),
        &[Para::new("H", 60, WHITE).bold().centered()],
    );
    c.text(
        inches(1.0),
        inches(3.5),
        inches(11.333),
        inches(1.5),
        &[Para::new(title, 44, WHITE).bold().centered()],
    );
    c.text(
        inches(1.0),
        inches(5.0),
        inches(11.333),
        inches(0.5),
        &[Para::new("ChatHDI - Hydrogen Development Indonesia", 20, HDI_GREEN).centered()],
    );
    c.into_xml()
}

fn content_slide(slide: &OutlineSlide) -> String {
    let mut c = SlideCanvas::new(BG);
    c.rect("rect", 0, 0, SLIDE_W, inches(1.2), BG_DARK);
    c.text(
        inches(0.5),
        inches(0.3),
        inches(12.333),
        inches(0.7),
        &[Para::new(&slide.title, 28, WHITE).bold()],
    );

    let bullets: Vec<String> = slide.bullets.iter().map(|b| format!("• {}", b)).collect();
    let paras: Vec<Para<'_>> = bullets
        .iter()
        .map(|b| Para::new(b, 18, "E5E7EB").space_after(12))
        .collect();
    c.text(inches(0.8), inches(1.8), inches(11.733), inches(5.0), &paras);

    c.rect("rect", inches(0.5), inches(7.0), inches(12.333), inches(0.02), HDI_GREEN);
    c.into_xml()
}

fn closing_slide() -> String {
    let mut c = SlideCanvas::new(BG_DARK);
    c.text(
        inches(1.0),
        inches(2.5),
        inches(11.333),
        inches(1.0),
        &[Para::new("Terima Kasih", 48, HDI_GREEN).bold().centered()],
    );
    c.text(
        inches(1.0),
        inches(3.7),
        inches(11.333),
        inches(0.5),
        &[Para::new("Ada pertanyaan?", 24, "9CA3AF").centered()],
    );
    c.text(
        inches(1.0),
        inches(5.0),
        inches(11.333),
        inches(1.0),
        &[Para::new("Dibuat dengan ChatHDI", 14, "6B7280").centered()],
    );
    c.into_xml()
}

fn content_types(slide_count: usize) -> String {
    let slides: String = (1..=slide_count)
        .map(|n| format!(r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#))
        .collect();
    format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>{slides}</Types>"#
    )
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_OFFICE}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{REL_OFFICE}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

fn presentation(slide_count: usize) -> String {
    // rId1 master, rId2 theme, slides from rId3
    let ids: String = (0..slide_count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 3 + i))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation {NS} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_W}" cy="{SLIDE_H}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let slides: String = (0..slide_count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="{REL_OFFICE}/slide" Target="slides/slide{}.xml"/>"#,
                3 + i,
                1 + i
            )
        })
        .collect();
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_OFFICE}/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="{REL_OFFICE}/theme" Target="theme/theme1.xml"/>{slides}</Relationships>"#
    )
}

fn slide_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_OFFICE}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#
    )
}

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{EMPTY_TREE}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_master_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_OFFICE}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL_OFFICE}/theme" Target="../theme/theme1.xml"/></Relationships>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank">{EMPTY_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn slide_layout_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_OFFICE}/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#
    )
}

fn theme() -> String {
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#;
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="ChatHDI"><a:themeElements><a:clrScheme name="ChatHDI"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="171717"/></a:dk2><a:lt2><a:srgbClr val="E5E7EB"/></a:lt2><a:accent1><a:srgbClr val="10B981"/></a:accent1><a:accent2><a:srgbClr val="06B6D4"/></a:accent2><a:accent3><a:srgbClr val="9CA3AF"/></a:accent3><a:accent4><a:srgbClr val="6B7280"/></a:accent4><a:accent5><a:srgbClr val="212121"/></a:accent5><a:accent6><a:srgbClr val="F59E0B"/></a:accent6><a:hlink><a:srgbClr val="06B6D4"/></a:hlink><a:folHlink><a:srgbClr val="10B981"/></a:folHlink></a:clrScheme><a:fontScheme name="ChatHDI"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="ChatHDI"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

fn core_props(title: &str) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>ChatHDI</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
        escape(title)
    )
}

fn app_props(slide_count: usize) -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>ChatHDI</Application><Slides>{slide_count}</Slides></Properties>"#
    )
}

/// Renders a title slide, one slide per outline entry and a closing slide
#[derive(Debug, Default, Clone, Copy)]
pub struct DeckBuilder;

impl DeckBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, title: &str, slides: &[OutlineSlide]) -> Result<Vec<u8>, DeckError> {
        let mut parts: Vec<String> = Vec::with_capacity(slides.len() + 2);
        parts.push(title_slide(title));
        parts.extend(slides.iter().map(content_slide));
        parts.push(closing_slide());
        let count = parts.len();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, body: &str| -> Result<(), DeckError> {
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
            Ok(())
        };

        put(&mut zip, "[Content_Types].xml", &content_types(count))?;
        put(&mut zip, "_rels/.rels", &root_rels())?;
        put(&mut zip, "docProps/core.xml", &core_props(title))?;
        put(&mut zip, "docProps/app.xml", &app_props(count))?;
        put(&mut zip, "ppt/presentation.xml", &presentation(count))?;
        put(&mut zip, "ppt/_rels/presentation.xml.rels", &presentation_rels(count))?;
        put(&mut zip, "ppt/slideMasters/slideMaster1.xml", &slide_master())?;
        put(&mut zip, "ppt/slideMasters/_rels/slideMaster1.xml.rels", &slide_master_rels())?;
        put(&mut zip, "ppt/slideLayouts/slideLayout1.xml", &slide_layout())?;
        put(&mut zip, "ppt/slideLayouts/_rels/slideLayout1.xml.rels", &slide_layout_rels())?;
        put(&mut zip, "ppt/theme/theme1.xml", &theme())?;

        for (i, xml) in parts.iter().enumerate() {
            let n = i + 1;
            put(&mut zip, &format!("ppt/slides/slide{n}.xml"), xml)?;
            put(&mut zip, &format!("ppt/slides/_rels/slide{n}.xml.rels"), &slide_rels())?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!("Built deck '{}' with {} slides ({} bytes)", title, count, bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    fn slides() -> Vec<OutlineSlide> {
        vec![
            OutlineSlide {
                title: "Pendahuluan".to_string(),
                bullets: vec!["H2 & energi".to_string(), "Elektrolisis".to_string()],
            },
            OutlineSlide {
                title: "Penutup".to_string(),
                bullets: vec!["Ringkasan".to_string()],
            },
        ]
    }

    #[test]
    fn test_deck_has_title_content_and_closing_slides() {
        let bytes = DeckBuilder::new().build("Energi <Hidrogen>", &slides()).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let slide_parts = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/slides/slide"))
            .count();
        assert_eq!(slide_parts, 4);

        let first = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(first.contains("Energi &lt;Hidrogen&gt;"));
        let second = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(second.contains("• H2 &amp; energi"));
        let last = read_part(&bytes, "ppt/slides/slide4.xml");
        assert!(last.contains("Terima Kasih"));
    }

    #[test]
    fn test_package_parts_reference_every_slide() {
        let bytes = DeckBuilder::new().build("T", &slides()).unwrap();
        let types = read_part(&bytes, "[Content_Types].xml");
        let rels = read_part(&bytes, "ppt/_rels/presentation.xml.rels");
        let pres = read_part(&bytes, "ppt/presentation.xml");
        for n in 1..=4 {
            assert!(types.contains(&format!("/ppt/slides/slide{n}.xml")));
            assert!(rels.contains(&format!("slides/slide{n}.xml")));
        }
        assert!(pres.contains(r#"<p:sldId id="259" r:id="rId6"/>"#));
    }

    #[test]
    fn test_empty_outline_still_builds() {
        let bytes = DeckBuilder::new().build("Kosong", &[]).unwrap();
        assert!(read_part(&bytes, "ppt/slides/slide2.xml").contains("Terima Kasih"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a&b<c>"d'"#), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }
}
