//! # 乗車券 PDF
//!
//! 乗車券確認メールに添付する 80 × 100 mm の PDF を生成する。
//!
//! ## レイアウト
//!
//! ```text
//! ┌──────────────────────────┐
//! │ VÉ XE KHÁCH BUSIFY       │
//! │ Xin chào {氏名}          │
//! │ 便情報（1 枚目の乗車券）  │
//! │ 乗車券コード/座席 │ QR    │
//! │ 注意事項                 │
//! └──────────────────────────┘
//! ```
//!
//! 1 ページ目に収まらない乗車券は 2 ページ目以降に続けて一覧する。
//!
//! QR コードはモジュールごとに塗りつぶし矩形として描画する。
//! 予約全体で 1 つ、ペイロードは [`qr_payload`]。

use std::{io::Cursor, path::Path};

use busify_domain::notification::{Notification, NotificationError, TicketInfo};
use printpdf::{
    BuiltinFont,
    IndirectFontRef,
    Mm,
    PdfDocument,
    PdfDocumentReference,
    PdfLayerReference,
    Rect,
    Rgb,
    path::PaintMode,
};
use qrcode::QrCode;

use super::format::{format_vn_datetime, format_vnd};

/// 添付ファイル名
pub const TICKET_PDF_FILENAME: &str = "ve-xe-busify.pdf";

const PAGE_WIDTH: f32 = 80.0;
const PAGE_HEIGHT: f32 = 100.0;
const MARGIN: f32 = 5.0;

const QR_SIZE: f32 = 22.0;
const QR_LEFT: f32 = 52.0;

const TICKET_ROW_TOP: f32 = 55.0;
const CONTINUATION_ROW_TOP: f32 = 88.0;
const TICKET_ROW_BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 3.5;

/// 1 ページ目に並べる乗車券の行数
const FIRST_PAGE_ROWS: usize = ((TICKET_ROW_TOP - TICKET_ROW_BOTTOM) / ROW_HEIGHT) as usize;
/// 2 ページ目以降に並べる乗車券の行数
const CONTINUATION_ROWS: usize =
    ((CONTINUATION_ROW_TOP - TICKET_ROW_BOTTOM) / ROW_HEIGHT) as usize;

const FOOTER_NOTES: [&str; 3] = [
    "- Vui lòng mang theo giấy tờ tùy thân khi lên xe",
    "- Có mặt tại điểm đón trước giờ khởi hành 15 phút",
    "- Liên hệ tổng đài nếu cần hỗ trợ",
];

/// QR コードのペイロード
pub fn qr_payload(booking_code: &str, full_name: &str) -> String {
    format!("Mã đặt chỗ: {booking_code}\nHành khách: {full_name}")
}

/// ペイロードを QR コードにエンコードし、行優先の暗モジュール表を返す
///
/// 戻り値は `(1 辺のモジュール数, 暗モジュールなら true)`。
pub fn qr_modules(payload: &str) -> Result<(usize, Vec<bool>), NotificationError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| NotificationError::DocumentFailed(format!("QR コード生成失敗: {e}")))?;
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == qrcode::Color::Dark)
        .collect();
    Ok((code.width(), modules))
}

/// 乗車券 PDF に載せる内容
///
/// 便情報と QR コードは 1 枚目の乗車券から作る。
#[derive(Debug)]
pub struct TicketDocument<'a> {
    pub full_name:  &'a str,
    pub first:      &'a TicketInfo,
    pub qr_payload: String,
    /// ページごとの乗車券一覧（先頭が 1 ページ目）
    pub pages:      Vec<&'a [TicketInfo]>,
}

impl<'a> TicketDocument<'a> {
    pub fn new(full_name: &'a str, tickets: &'a [TicketInfo]) -> Result<Self, NotificationError> {
        let first = tickets.first().ok_or_else(|| {
            NotificationError::DocumentFailed("乗車券が 1 枚も指定されていません".to_string())
        })?;

        let (first_page, rest) = tickets.split_at(tickets.len().min(FIRST_PAGE_ROWS));
        let pages = std::iter::once(first_page)
            .chain(rest.chunks(CONTINUATION_ROWS))
            .collect();

        Ok(Self {
            full_name,
            first,
            qr_payload: qr_payload(&first.booking_code, full_name),
            pages,
        })
    }

    /// 乗車券確認の通知から組み立てる。それ以外の種別は `None`
    pub fn from_notification(
        notification: &'a Notification,
    ) -> Result<Option<Self>, NotificationError> {
        match notification {
            Notification::TicketConfirmation {
                full_name, tickets, ..
            } => Self::new(full_name, tickets).map(Some),
            _ => Ok(None),
        }
    }
}

/// 乗車券 PDF レンダラー
pub struct TicketPdfRenderer {
    /// TrueType フォント（未設定時は Helvetica）
    font: Option<Vec<u8>>,
}

struct Fonts {
    regular: IndirectFontRef,
    bold:    IndirectFontRef,
}

impl TicketPdfRenderer {
    /// 組み込みフォントを使うレンダラー
    ///
    /// 組み込みフォントはベトナム語の声調記号を表示できない。
    pub fn builtin() -> Self {
        Self { font: None }
    }

    /// フォントファイルを読み込む
    pub fn new(font_path: Option<&Path>) -> Result<Self, NotificationError> {
        let font = font_path
            .map(|path| {
                std::fs::read(path).map_err(|e| {
                    NotificationError::DocumentFailed(format!(
                        "フォント {} の読み込みに失敗: {e}",
                        path.display()
                    ))
                })
            })
            .transpose()?;
        Ok(Self { font })
    }

    /// 乗車券 PDF を生成する
    ///
    /// `document.pages` の 1 要素が PDF の 1 ページになる。
    pub fn render(&self, document: &TicketDocument<'_>) -> Result<Vec<u8>, NotificationError> {
        let (doc, page, layer) =
            PdfDocument::new("Busify", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let fonts = self.load_fonts(&doc)?;
        let layer = doc.get_page(page).get_layer(layer);
        let full_name = document.full_name;

        // ヘッダー
        layer.use_text("VÉ XE KHÁCH BUSIFY", 7.0, Mm(22.0), Mm(94.0), &fonts.bold);
        layer.use_text(
            format!("Xin chào {full_name}"),
            5.0,
            Mm(MARGIN),
            Mm(89.0),
            &fonts.regular,
        );

        // 便情報
        let first = document.first;
        let trip = &first.trip;
        let trip_rows = [
            (
                "Tuyến đi",
                format!("{} → {}", trip.start_location, trip.end_location),
            ),
            ("Ngày đi", format_vn_datetime(trip.departure_time)),
            ("Dự kiến đến", format_vn_datetime(trip.estimated_arrival_time)),
            ("Xe/ Biển số", trip.license_plate.clone()),
            ("Giá vé", format!("{} VND", format_vnd(first.price))),
            ("Hành khách", full_name.to_string()),
            ("Số điện thoại", first.passenger_phone.clone()),
        ];
        let mut y = 84.0;
        for (label, value) in trip_rows {
            layer.use_text(label, 5.0, Mm(MARGIN), Mm(y), &fonts.bold);
            layer.use_text(value, 5.0, Mm(25.0), Mm(y), &fonts.regular);
            y -= ROW_HEIGHT;
        }

        // 乗車券一覧（1 ページ目）
        let first_rows = document.pages.first().copied().unwrap_or_default();
        draw_ticket_table(&layer, &fonts, first_rows, TICKET_ROW_TOP);

        // 予約コードと QR
        layer.use_text(
            format!("Mã đặt chỗ: {}", first.booking_code),
            5.0,
            Mm(QR_LEFT - 2.0),
            Mm(TICKET_ROW_TOP + ROW_HEIGHT),
            &fonts.bold,
        );
        draw_qr(&layer, &document.qr_payload, QR_LEFT, TICKET_ROW_TOP + 1.0)?;

        // フッター
        layer.use_text("Lưu ý:", 5.0, Mm(MARGIN), Mm(15.0), &fonts.bold);
        let mut y = 12.0;
        for note in FOOTER_NOTES {
            layer.use_text(note, 5.0, Mm(MARGIN), Mm(y), &fonts.regular);
            y -= 3.0;
        }

        // 乗車券一覧（2 ページ目以降）
        let page_count = document.pages.len();
        for (index, rows) in document.pages.iter().enumerate().skip(1) {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            let layer = doc.get_page(page).get_layer(layer);
            layer.use_text(
                format!(
                    "Mã đặt chỗ: {} ({}/{page_count})",
                    first.booking_code,
                    index + 1
                ),
                5.0,
                Mm(MARGIN),
                Mm(94.0),
                &fonts.bold,
            );
            draw_ticket_table(&layer, &fonts, rows, CONTINUATION_ROW_TOP);
        }

        doc.save_to_bytes()
            .map_err(|e| NotificationError::DocumentFailed(format!("PDF 書き出し失敗: {e:?}")))
    }

    fn load_fonts(&self, doc: &PdfDocumentReference) -> Result<Fonts, NotificationError> {
        let font_error = |e: printpdf::Error| {
            NotificationError::DocumentFailed(format!("フォント登録失敗: {e:?}"))
        };

        match &self.font {
            Some(bytes) => {
                let font = doc
                    .add_external_font(Cursor::new(bytes.as_slice()))
                    .map_err(font_error)?;
                Ok(Fonts {
                    regular: font.clone(),
                    bold:    font,
                })
            }
            None => Ok(Fonts {
                regular: doc
                    .add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(font_error)?,
                bold:    doc
                    .add_builtin_font(BuiltinFont::HelveticaBold)
                    .map_err(font_error)?,
            }),
        }
    }
}

/// 乗車券コードと座席の表を `top` から下へ描画する
fn draw_ticket_table(layer: &PdfLayerReference, fonts: &Fonts, rows: &[TicketInfo], top: f32) {
    layer.use_text("Mã vé", 5.0, Mm(MARGIN), Mm(top + ROW_HEIGHT), &fonts.bold);
    layer.use_text("Ghế", 5.0, Mm(30.0), Mm(top + ROW_HEIGHT), &fonts.bold);
    let mut y = top;
    for ticket in rows {
        layer.use_text(&ticket.ticket_code, 5.0, Mm(MARGIN), Mm(y), &fonts.regular);
        layer.use_text(&ticket.seat_number, 5.0, Mm(30.0), Mm(y), &fonts.regular);
        y -= ROW_HEIGHT;
    }
}

/// QR コードを左上 `(left, top)` から `QR_SIZE` 四方に描画する
fn draw_qr(
    layer: &PdfLayerReference,
    payload: &str,
    left: f32,
    top: f32,
) -> Result<(), NotificationError> {
    let (width, modules) = qr_modules(payload)?;
    let module = QR_SIZE / width as f32;

    layer.set_fill_color(printpdf::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    for (index, _) in modules.iter().enumerate().filter(|(_, dark)| **dark) {
        let (row, col) = ((index / width) as f32, (index % width) as f32);
        let rect = Rect::new(
            Mm(left + col * module),
            Mm(top - (row + 1.0) * module),
            Mm(left + (col + 1.0) * module),
            Mm(top - row * module),
        )
        .with_mode(PaintMode::Fill);
        layer.add_rect(rect);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use busify_domain::{notification::TripInfo, value_objects::Email};
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn ticket(code: &str, seat: &str) -> TicketInfo {
        TicketInfo {
            ticket_code:     code.to_string(),
            seat_number:     seat.to_string(),
            price:           250_000,
            passenger_phone: "0912345678".to_string(),
            booking_code:    "BK-20250115-001".to_string(),
            trip:            TripInfo {
                start_location:         "Bến xe Miền Đông".to_string(),
                end_location:           "Bến xe Đà Lạt".to_string(),
                departure_time:         DateTime::from_timestamp(1_736_910_000, 0).unwrap(),
                estimated_arrival_time: DateTime::from_timestamp(1_736_938_800, 0).unwrap(),
                license_plate:          "51B-123.45".to_string(),
            },
        }
    }

    #[test]
    fn test_qrペイロードに予約コードと氏名をそのまま含める() {
        let payload = qr_payload("BK-20250115-001", "Trần Thị Bích");

        assert_eq!(payload, "Mã đặt chỗ: BK-20250115-001\nHành khách: Trần Thị Bích");
    }

    #[test]
    fn test_qrモジュールは正方形で暗モジュールを含む() {
        let (width, modules) = qr_modules(&qr_payload("BK-1", "Lê Văn C")).unwrap();

        assert_eq!(modules.len(), width * width);
        assert!(modules.iter().any(|dark| *dark));
        // 左上のファインダーパターン
        assert!(modules[0]);
    }

    fn tickets(count: usize) -> Vec<TicketInfo> {
        (1..=count)
            .map(|i| ticket(&format!("TK-{i:03}"), &format!("B{i:02}")))
            .collect()
    }

    fn page_sizes(document: &TicketDocument<'_>) -> Vec<usize> {
        document.pages.iter().map(|rows| rows.len()).collect()
    }

    #[test]
    fn test_組み込みフォントでpdfを生成できる() {
        let tickets = [ticket("TK-001", "A01"), ticket("TK-002", "A02")];
        let document = TicketDocument::new("Trần Thị Bích", &tickets).unwrap();

        let bytes = TicketPdfRenderer::builtin().render(&document).unwrap();

        assert!(bytes.starts_with(b"%PDF"));
    }

    #[rstest]
    #[case::一枚(1, vec![1])]
    #[case::一ページ目ちょうど(10, vec![10])]
    #[case::二ページ目に続く(12, vec![10, 2])]
    #[case::三ページ(40, vec![10, 19, 11])]
    fn test_乗車券は全件をページに割り付ける(#[case] count: usize, #[case] expected: Vec<usize>) {
        let tickets = tickets(count);

        let document = TicketDocument::new("Trần Thị Bích", &tickets).unwrap();

        assert_eq!(page_sizes(&document), expected);
        let listed: Vec<&str> = document
            .pages
            .iter()
            .flat_map(|rows| rows.iter().map(|t| t.ticket_code.as_str()))
            .collect();
        let all: Vec<&str> = tickets.iter().map(|t| t.ticket_code.as_str()).collect();
        assert_eq!(listed, all);
    }

    #[test]
    fn test_一ページに収まらない乗車券も複数ページのpdfにする() {
        let tickets = tickets(12);
        let document = TicketDocument::new("Trần Thị Bích", &tickets).unwrap();

        let bytes = TicketPdfRenderer::builtin().render(&document).unwrap();

        assert_eq!(document.pages.len(), 2);
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_乗車券がない場合はdocument_failed() {
        let err = TicketDocument::new("Trần Thị Bích", &[]).unwrap_err();

        assert!(matches!(err, NotificationError::DocumentFailed(_)));
    }

    #[test]
    fn test_乗車券確認の通知から予約コードと氏名のqrペイロードを作る() {
        let notification = Notification::TicketConfirmation {
            to:        Email::new("khach@example.com").unwrap(),
            full_name: "Trần Thị Bích".to_string(),
            tickets:   vec![ticket("TK-001", "A01")],
        };

        let document = TicketDocument::from_notification(&notification)
            .unwrap()
            .unwrap();

        assert_eq!(
            document.qr_payload,
            "Mã đặt chỗ: BK-20250115-001\nHành khách: Trần Thị Bích"
        );
    }

    #[test]
    fn test_乗車券確認以外の通知ではpdfを作らない() {
        let notification = Notification::TicketCancelled {
            to:          Email::new("khach@example.com").unwrap(),
            full_name:   "Nguyễn Văn A".to_string(),
            ticket_code: "TK-009".to_string(),
        };

        let document = TicketDocument::from_notification(&notification).unwrap();

        assert!(document.is_none());
    }

    #[test]
    fn test_存在しないフォントファイルはdocument_failed() {
        let result = TicketPdfRenderer::new(Some(Path::new("/nonexistent/DejaVuSans.ttf")));

        assert!(matches!(result, Err(NotificationError::DocumentFailed(_))));
    }

    #[test]
    fn test_フォント未指定は組み込みフォント() {
        let renderer = TicketPdfRenderer::new(None).unwrap();

        assert!(renderer.font.is_none());
    }
}
