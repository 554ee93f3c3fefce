use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use autoclaim_core::report::{
    text_width, Align, DrawOp, Page, PageLayout, RasterImage, RenderError, ReportDocument, Rgb,
    TextStyle, MM_PER_PT,
};
use autoclaim_core::Result;

use crate::encoding::encode_win_ansi;

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";
const LINE_WIDTH_PT: f32 = 0.5;

/// Maps the document's top-left millimetre space onto PDF user space.
struct Geometry {
    page_height_pt: f32,
}

impl Geometry {
    fn new(layout: &PageLayout) -> Self {
        Self {
            page_height_pt: layout.height / MM_PER_PT,
        }
    }

    fn x(&self, mm: f32) -> f32 {
        mm / MM_PER_PT
    }

    fn y(&self, mm: f32) -> f32 {
        self.page_height_pt - mm / MM_PER_PT
    }

    fn span(&self, mm: f32) -> f32 {
        mm / MM_PER_PT
    }
}

fn image_name(index: usize) -> String {
    format!("Im{}", index)
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

fn color_op(operator: &str, color: Rgb) -> Operation {
    Operation::new(operator, reals(&color.unit()))
}

fn write_failed(err: impl std::fmt::Display) -> RenderError {
    RenderError::WriteFailed(err.to_string())
}

fn deflate(data: &[u8]) -> std::result::Result<Vec<u8>, RenderError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(write_failed)?;
    encoder.finish().map_err(write_failed)
}

fn text_ops(geometry: &Geometry, x: f32, y: f32, text: &str, style: &TextStyle, align: Align) -> Vec<Operation> {
    let start_x = match align {
        Align::Left => x,
        Align::Right => x - text_width(text, style.size_pt, style.bold),
    };
    let font = if style.bold { BOLD_FONT } else { REGULAR_FONT };
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), Object::Real(style.size_pt)],
        ),
        color_op("rg", style.color),
        Operation::new(
            "Td",
            vec![Object::Real(geometry.x(start_x)), Object::Real(geometry.y(y))],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn draw_ops(geometry: &Geometry, op: &DrawOp) -> Vec<Operation> {
    match op {
        DrawOp::Text {
            x,
            y,
            text,
            style,
            align,
        } => text_ops(geometry, *x, *y, text, style, *align),
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color,
        } => vec![
            color_op("RG", *color),
            Operation::new("w", vec![Object::Real(LINE_WIDTH_PT)]),
            Operation::new("m", vec![Object::Real(geometry.x(*x1)), Object::Real(geometry.y(*y1))]),
            Operation::new("l", vec![Object::Real(geometry.x(*x2)), Object::Real(geometry.y(*y2))]),
            Operation::new("S", vec![]),
        ],
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
            stroke,
        } => {
            let mut ops = Vec::new();
            if let Some(color) = fill {
                ops.push(color_op("rg", *color));
            }
            if let Some(color) = stroke {
                ops.push(color_op("RG", *color));
                ops.push(Operation::new("w", vec![Object::Real(LINE_WIDTH_PT)]));
            }
            ops.push(Operation::new(
                "re",
                reals(&[
                    geometry.x(*x),
                    geometry.y(*y + *height),
                    geometry.span(*width),
                    geometry.span(*height),
                ]),
            ));
            let paint = match (fill, stroke) {
                (Some(_), Some(_)) => "B",
                (Some(_), None) => "f",
                (None, Some(_)) => "S",
                (None, None) => "n",
            };
            ops.push(Operation::new(paint, vec![]));
            ops
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            image,
        } => vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                reals(&[
                    geometry.span(*width),
                    0.0,
                    0.0,
                    geometry.span(*height),
                    geometry.x(*x),
                    geometry.y(*y + *height),
                ]),
            ),
            Operation::new("Do", vec![Object::Name(image_name(*image).into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    }
}

fn page_content(geometry: &Geometry, page: &Page) -> Content {
    let operations = page
        .blocks
        .iter()
        .flat_map(|block| block.ops.iter())
        .flat_map(|op| draw_ops(geometry, op))
        .collect();
    Content { operations }
}

fn font_object(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn image_object(image: &RasterImage) -> std::result::Result<Stream, RenderError> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, deflate(&image.rgb)?))
}

/// Renders a paginated report into PDF bytes.
///
/// One PDF page per document page, in order. Text uses the standard
/// Helvetica faces, so nothing is embedded except the snapshot image.
pub fn render_pdf(document: &ReportDocument) -> Result<Vec<u8>> {
    let geometry = Geometry::new(&document.layout);
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_object("Helvetica"));
    let bold_id = doc.add_object(font_object("Helvetica-Bold"));

    let mut xobjects = Dictionary::new();
    for (index, image) in document.images.iter().enumerate() {
        let image_id = doc.add_object(image_object(image)?);
        xobjects.set(image_name(index), Object::Reference(image_id));
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => Object::Reference(regular_id),
            BOLD_FONT => Object::Reference(bold_id),
        },
        "XObject" => xobjects,
    });

    let media_box = Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(geometry.span(document.layout.width)),
        Object::Real(geometry.page_height_pt),
    ]);

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = page_content(&geometry, page).encode().map_err(write_failed)?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => media_box.clone(),
            "Resources" => Object::Reference(resources_id),
            "Contents" => Object::Reference(content_id),
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => page_ids.len() as i64,
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<Object>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(write_failed)?;

    debug!(
        "Rendered report {} into {} pages ({} bytes)",
        document.report_id,
        page_ids.len(),
        buffer.len()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclaim_core::assessment::{
        AssessmentResult, DamageFinding, DamageType, Location, PartKind, PartOption, RepairCosts,
        Severity,
    };
    use autoclaim_core::fx::CurrencyCode;
    use autoclaim_core::report::ReportPaginator;
    use chrono::{TimeZone, Utc};
    use flate2::read::ZlibDecoder;
    use rust_decimal_macros::dec;
    use std::io::Read;

    fn assessment(findings: usize) -> AssessmentResult {
        let damages: Vec<DamageFinding> = (0..findings)
            .map(|i| DamageFinding {
                id: format!("d{}", i),
                damage_type: DamageType::Scratch,
                severity: Severity::Medium,
                description: "Long scratch along the rear quarter panel and bumper.".to_string(),
                estimated_cost: dec!(5000),
                repair_costs: RepairCosts {
                    labor: dec!(2000),
                    parts: vec![PartOption {
                        kind: PartKind::Aftermarket,
                        price: dec!(3000),
                        availability: None,
                    }],
                    best_option_total: dec!(5000),
                    best_option_index: 0,
                },
                location: Location::new(10.0, 10.0, 500.0, 500.0),
            })
            .collect();
        AssessmentResult {
            id: "report-1".to_string(),
            vehicle_type: "Toyota Corolla".to_string(),
            total_estimated_cost: damages.iter().map(|d| d.estimated_cost).sum(),
            damages,
            summary: "Cosmetic damage on the rear.".to_string(),
            confidence_score: 0.75,
            created_at: Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap(),
        }
    }

    fn page_strings(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_renders_one_pdf_page_per_document_page() {
        let document = ReportPaginator::default()
            .paginate_with_image(&assessment(30), CurrencyCode::Pkr, None)
            .unwrap();
        assert!(document.page_count() > 1);

        let bytes = render_pdf(&document).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));

        let pdf = Document::load_mem(&bytes).unwrap();
        assert_eq!(pdf.get_pages().len(), document.page_count());
    }

    #[test]
    fn test_text_is_written_win_ansi() {
        let document = ReportPaginator::default()
            .paginate_with_image(&assessment(2), CurrencyCode::Eur, None)
            .unwrap();
        let pdf = Document::load_mem(&render_pdf(&document).unwrap()).unwrap();
        let first_page = *pdf.get_pages().get(&1).unwrap();
        let strings = page_strings(&pdf, first_page);

        assert!(strings.contains(&b"Damage Assessment Report".to_vec()));
        // 10000 PKR / 278.50 * 0.92 = 33.03
        assert!(strings.contains(&vec![0x80, b'3', b'3']));
    }

    #[test]
    fn test_snapshot_becomes_image_xobject() {
        let image = RasterImage::new(3, 2, vec![255; 18]).unwrap();
        let document = ReportPaginator::default()
            .paginate_with_image(&assessment(1), CurrencyCode::Pkr, Some(&image))
            .unwrap();
        let pdf = Document::load_mem(&render_pdf(&document).unwrap()).unwrap();

        let images: Vec<&Stream> = pdf
            .objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|stream| {
                stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name())
                    .map(|name| name == b"Image")
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dict.get(b"Width").unwrap().as_i64().unwrap(), 3);
        let mut pixels = Vec::new();
        ZlibDecoder::new(&images[0].content[..])
            .read_to_end(&mut pixels)
            .unwrap();
        assert_eq!(pixels, vec![255; 18]);
    }

    #[test]
    fn test_right_aligned_text_ends_at_anchor() {
        let geometry = Geometry::new(&PageLayout::default());
        let style = TextStyle::bold(12.0, Rgb::new(0, 0, 0));
        let ops = text_ops(&geometry, 190.0, 50.0, "PKR 12,500", &style, Align::Right);
        let td = ops.iter().find(|op| op.operator == "Td").unwrap();
        let x = match td.operands[0] {
            Object::Real(x) => x,
            _ => panic!("expected a real operand"),
        };
        let expected = (190.0 - text_width("PKR 12,500", 12.0, true)) / MM_PER_PT;
        assert!((x - expected).abs() < 0.01);
    }
}
