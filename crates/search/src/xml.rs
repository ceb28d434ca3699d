//! Reading and writing query trees as XML.
//!
//! ```xml
//! <methodref>
//!   <hasparam num="&lt;=2"/>
//!   <name><regex>get(\w+)</regex></name>
//!   <hassupertype><classname>com.acme.Base</classname></hassupertype>
//! </methodref>
//! ```

use crate::error::{Result, SearchError};
use crate::param::{Filter, NameMatcher, ParamCount, SearchKind, SearchParam};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use roxmltree::{Document, Node};
use std::io::Cursor;

fn xml_error(e: impl std::fmt::Display) -> SearchError {
    SearchError::Xml(e.to_string())
}

fn elements<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(|n| n.is_element())
}

fn read_matcher(node: Node) -> Result<NameMatcher> {
    match elements(node).find(|n| n.has_tag_name("regex")) {
        Some(regex) => NameMatcher::regex(regex.text().unwrap_or_default()),
        None => {
            let text: String = node
                .children()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            NameMatcher::literal(text.trim())
        }
    }
}

fn read_filters(node: Node) -> Result<Vec<Filter>> {
    elements(node).map(read_filter).collect()
}

fn read_filter(node: Node) -> Result<Filter> {
    match node.tag_name().name() {
        "name" => Ok(Filter::Name(read_matcher(node)?)),
        "classname" => Ok(Filter::ClassName(read_matcher(node)?)),
        "hasparam" => {
            let num = node
                .attribute("num")
                .ok_or_else(|| SearchError::InvalidArgument("hasparam needs a num attribute".to_string()))?;
            Ok(Filter::HasParam(ParamCount::parse(num)?))
        }
        "hassupertype" => Filter::has_supertype(read_filters(node)?),
        "issupertype" => Ok(Filter::IsSupertype),
        "isinmethod" => Filter::is_in_method(read_filters(node)?),
        "not" => Filter::not(read_filters(node)?),
        "and" => Filter::and(read_filters(node)?),
        other => Err(SearchError::Xml(format!("unknown filter element <{other}>"))),
    }
}

impl SearchParam {
    pub fn from_xml(text: &str) -> Result<Self> {
        let doc = Document::parse(text).map_err(xml_error)?;
        let root = doc.root_element();
        let tag = root.tag_name().name();
        let kind =
            SearchKind::from_tag(tag).ok_or_else(|| SearchError::Xml(format!("unknown search element <{tag}>")))?;
        SearchParam::new(kind, read_filters(root)?)
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        let tag = self.kind().tag();
        writer
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(xml_error)?;
        for filter in self.filters() {
            write_filter(&mut writer, filter)?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
        String::from_utf8(writer.into_inner().into_inner()).map_err(xml_error)
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write_matcher(writer: &mut XmlWriter, tag: &str, matcher: &NameMatcher) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_error)?;
    if matcher.is_regex() {
        writer
            .write_event(Event::Start(BytesStart::new("regex")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Text(BytesText::new(matcher.pattern())))
            .map_err(xml_error)?;
        writer.write_event(Event::End(BytesEnd::new("regex"))).map_err(xml_error)?;
    } else {
        writer
            .write_event(Event::Text(BytesText::new(matcher.pattern())))
            .map_err(xml_error)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
    Ok(())
}

fn write_filter(writer: &mut XmlWriter, filter: &Filter) -> Result<()> {
    let tag = filter.tag();
    match filter {
        Filter::Name(m) | Filter::ClassName(m) => write_matcher(writer, tag, m),
        Filter::HasParam(count) => {
            let mut start = BytesStart::new(tag);
            start.push_attribute(("num", count.to_string().as_str()));
            writer.write_event(Event::Empty(start)).map_err(xml_error)?;
            Ok(())
        }
        Filter::IsSupertype => {
            writer
                .write_event(Event::Empty(BytesStart::new(tag)))
                .map_err(xml_error)?;
            Ok(())
        }
        Filter::HasSupertype(subs) | Filter::IsInMethod(subs) | Filter::Not(subs) | Filter::And(subs) => {
            writer.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_error)?;
            for sub in subs {
                write_filter(writer, sub)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_error)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(xml: &str) -> SearchParam {
        let param = SearchParam::from_xml(xml).expect("parse query");
        let written = param.to_xml().expect("write query");
        let again = SearchParam::from_xml(&written).expect("reparse query");
        assert_eq!(param, again, "lossy round trip through:\n{written}");
        param
    }

    #[test]
    fn class_declaration_round_trips() {
        let param = round_trip(
            "<classdecl><name><regex>com\\.acme\\..*Bean</regex></name>\
             <hassupertype><name>javax.ejb.EntityBean</name></hassupertype></classdecl>",
        );
        assert_eq!(param.kind(), SearchKind::ClassDecl);
    }

    #[test]
    fn class_reference_round_trips() {
        let param = round_trip("<classref><name>javax.ejb.FinderException</name><issupertype/></classref>");
        assert_eq!(param.filters()[1], Filter::IsSupertype);
    }

    #[test]
    fn method_declaration_round_trips() {
        let param = round_trip(
            "<methoddecl><name>ejbCreate</name><hasparam num=\"&gt;=1\"/>\
             <classname><regex>.*(Bean|Impl)</regex></classname></methoddecl>",
        );
        assert_eq!(param.filters()[1], Filter::HasParam(ParamCount::parse(">=1").expect("count")));
    }

    #[test]
    fn method_reference_round_trips() {
        round_trip(
            "<methodref><hasparam num=\"&lt;=2\"/><name>lookup</name>\
             <isinmethod><not><name>main</name><hasparam num=\"=1\"/></not></isinmethod>\
             <and><classname>javax.naming.Context</classname></and></methodref>",
        );
    }

    #[test]
    fn malformed_queries_are_rejected() {
        assert!(SearchParam::from_xml("<classref/>").is_err());
        assert!(SearchParam::from_xml("<fieldref><name>x</name></fieldref>").is_err());
        assert!(SearchParam::from_xml("<methodref><hasparam/></methodref>").is_err());
        assert!(SearchParam::from_xml("<methodref><not/></methodref>").is_err());
        assert!(SearchParam::from_xml("<classref><name>").is_err());
    }
}
