//! Benchmarks for item extraction over a static listing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pageflow::extract::{FieldExtractor, FieldSpec, Normalizer, SelectorExtractor, ValueTable};
use pageflow::web::HtmlPage;

fn listing(items: usize) -> String {
    let body: String = (0..items)
        .map(|i| {
            format!(
                r#"<article class="product_pod">
                    <p class="star-rating Three"></p>
                    <h3><a href="catalogue/book_{i}/index.html" title="Book {i}">Book {i}</a></h3>
                    <div class="product_price"><p class="price_color">£{i}.99</p></div>
                </article>"#
            )
        })
        .collect();
    format!("<html><body><ol class=\"row\">{body}</ol></body></html>")
}

fn extractor() -> SelectorExtractor {
    SelectorExtractor::new(vec![
        FieldSpec::attr("title", "h3 a", "title").required(),
        FieldSpec::text("price", "p.price_color").normalize(Normalizer::StripCurrency),
        FieldSpec::class_token("rating", "p.star-rating").normalize(Normalizer::Lookup {
            table: ValueTable::star_ratings(),
        }),
        FieldSpec::absolute_url("url", "h3 a", "href"),
    ])
    .expect("valid selectors")
}

fn extract_benchmark(c: &mut Criterion) {
    let extractor = extractor();
    let page = HtmlPage::parse(
        "https://books.toscrape.com/catalogue/page-1.html",
        1,
        listing(20),
        "article.product_pod",
    )
    .expect("valid page");

    c.bench_function("html_items_20", |b| b.iter(|| black_box(page.html_items())));

    let items = page.html_items();
    c.bench_function("extract_page_20", |b| {
        b.iter(|| {
            for item in &items {
                let _ = black_box(extractor.extract(item));
            }
        });
    });
}

criterion_group!(benches, extract_benchmark);
criterion_main!(benches);
